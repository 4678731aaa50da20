//! Shared primitives for provider-agnostic LLM clients.
//!
//! Components in this crate talk to language models exclusively through the
//! [`ClientWrapper`] trait and the small set of data types defined here. The
//! trait abstracts over concrete vendor implementations ([`crate::core::clients`])
//! while the supporting structs describe chat messages, streaming chunks, and
//! token accounting in a provider-neutral shape.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pmcopilot_core::core::client_wrapper::{ClientWrapper, Message, Role};
//! use pmcopilot_core::core::clients::openai::{Model, OpenAIClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let key = std::env::var("OPENAI_API_KEY")?;
//!     let client = OpenAIClient::new_with_model_enum(&key, Model::GPT41Nano);
//!
//!     let response = client
//!         .send_message(&[Message { role: Role::User, content: Arc::from("Who are you?") }])
//!         .await?;
//!
//!     println!("Assistant: {}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// A system authored message that primes or constrains assistant behaviour.
    System,
    /// A user authored message.
    User,
    /// An assistant authored message (model responses).
    Assistant,
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    /// Number of prompt/input tokens billed by the provider.
    pub input_tokens: usize,
    /// Number of generated/output tokens billed by the provider.
    pub output_tokens: usize,
    /// Convenience total equal to `input_tokens + output_tokens`.
    pub total_tokens: usize,
}

/// A single chat message exchanged with a provider.
#[derive(Clone)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The message body. Stored as `Arc<str>` so conversation histories can be
    /// cheaply cloned by [`crate::core::context_builder`] and the agent pipeline.
    pub content: Arc<str>,
}

/// One incremental delta of a streaming response.
#[derive(Clone, Debug)]
pub struct MessageChunk {
    /// The incremental content delta in this chunk. May be empty for chunks
    /// that only carry a `finish_reason`.
    pub content: String,
    /// Provider specific completion status (e.g. `"stop"`), present on the
    /// final chunk of a stream.
    pub finish_reason: Option<String>,
}

/// Type alias for a stream of message chunks compatible with `Send` executors.
pub type MessageChunkStream =
    Pin<Box<dyn Stream<Item = Result<MessageChunk, Box<dyn Error + Send + Sync>>> + Send>>;

/// Type alias for the future returned by [`ClientWrapper::send_message_stream`].
pub type MessageStreamFuture<'a> = Pin<
    Box<
        dyn std::future::Future<Output = Result<Option<MessageChunkStream>, Box<dyn Error + Send + Sync>>>
            + Send
            + 'a,
    >,
>;

/// Trait-driven abstraction for a concrete LLM provider.
///
/// A [`ClientWrapper`] instance translates a provider-neutral chat request into
/// the vendor specific wire format and translates the response back. The
/// abstraction deliberately excludes any conversation bookkeeping, caching, or
/// routing — those live in [`crate::core::agent::Agent`] and
/// [`crate::core::context_builder`].
///
/// All implementations **must** be thread-safe (`Send + Sync`) so a single
/// client can be shared across concurrently fanned-out agent calls.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a full request/response style chat completion.
    ///
    /// `messages` must include any system priming messages the caller wishes
    /// to send; implementations are responsible for translating
    /// `max_tokens`/`max_completion_tokens` naming per the target model family.
    async fn send_message(&self, messages: &[Message]) -> Result<Message, Box<dyn Error + Send + Sync>>;

    /// Request a streaming response from the provider.
    ///
    /// Implementations that sit in front of providers without streaming
    /// support can inherit the default, which simply resolves to `Ok(None)`.
    fn send_message_stream<'a>(&'a self, _messages: &'a [Message]) -> MessageStreamFuture<'a> {
        Box::pin(async { Ok(None) })
    }

    /// Return the identifier used to select the upstream model (e.g. `"gpt-4.1"`).
    fn model_name(&self) -> &str;

    /// Hook to retrieve usage from the most recent [`ClientWrapper::send_message`] call.
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        if let Some(slot) = self.usage_slot() {
            slot.lock().await.clone()
        } else {
            None
        }
    }

    /// Expose a shared mutable slot where the implementation can persist token usage.
    ///
    /// By default wrappers report no usage data. Providers that expose billing
    /// information should return `Some(&Mutex<Option<TokenUsage>>)` so that
    /// [`ClientWrapper::get_last_usage`] can surface the recorded values.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        None
    }
}
