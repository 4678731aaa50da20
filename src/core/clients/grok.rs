//! xAI Grok client wrapper routed through the OpenAI-compatible surface.
//!
//! `GrokClient` connects to xAI's Grok models using the same transport as the
//! OpenAI client, so it plugs into [`crate::core::provider_registry`] without
//! any provider-specific branching elsewhere in the crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pmcopilot_core::core::client_wrapper::{ClientWrapper, Message, Role};
//! use pmcopilot_core::core::clients::grok::{GrokClient, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let key = std::env::var("XAI_API_KEY")?;
//!     let client = GrokClient::new_with_model_enum(&key, Model::Grok3Mini);
//!     let reply = client
//!         .send_message(&[Message {
//!             role: Role::User,
//!             content: Arc::<str>::from("Give me a witty coding tip."),
//!         }])
//!         .await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

use crate::core::client_wrapper::{ClientWrapper, Message, TokenUsage};
use crate::core::clients::openai::OpenAIClient;
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::Mutex;

/// Client wrapper for xAI's Grok models accessed via the OpenAI-style API surface.
pub struct GrokClient {
    /// Delegated OpenAI-compatible client.
    delegate_client: OpenAIClient,
    /// Selected Grok model name.
    model: String,
}

/// Grok model identifiers exposed through the compatibility layer.
pub enum Model {
    /// `grok-3-mini` – economical Grok 3 mini. The default Fast-tier model.
    Grok3Mini,
    /// `grok-3` – general Grok 3 release. The default Standard-tier model.
    Grok3,
    /// `grok-4-0709` – the default Premium-tier model.
    Grok4_0709,
}

/// Convert a [`Model`] variant into the identifier expected by the xAI API.
fn model_to_string(model: Model) -> String {
    match model {
        Model::Grok3Mini => "grok-3-mini".to_string(),
        Model::Grok3 => "grok-3".to_string(),
        Model::Grok4_0709 => "grok-4-0709".to_string(),
    }
}

impl GrokClient {
    /// Construct a client from an API key and typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Construct a client from an API key and explicit model name.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        GrokClient {
            delegate_client: OpenAIClient::new_with_base_url(secret_key, model_name, "https://api.x.ai/v1"),
            model: model_name.to_string(),
        }
    }

    /// Construct a client for Grok-compatible endpoints hosted at a custom base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        GrokClient {
            delegate_client: OpenAIClient::new_with_base_url(secret_key, model_name, base_url),
            model: model_name.to_string(),
        }
    }
}

#[async_trait]
impl ClientWrapper for GrokClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, messages: &[Message]) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.delegate_client.send_message(messages).await
    }

    fn send_message_stream<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> crate::core::client_wrapper::MessageStreamFuture<'a> {
        self.delegate_client.send_message_stream(messages)
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.delegate_client.usage_slot()
    }
}
