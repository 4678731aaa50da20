//! Stateless per-role agent pipeline.
//!
//! No persistent session is kept between calls: a fresh message vector is
//! built from the supplied context on every invocation, and the system
//! prompt is rendered the same way each time ("Render(agentProfile,
//! contextSummary) -> string"). Layered around that core call is a cache
//! probe, message compaction, query rewriting, a hard timeout, and cache
//! population, since agents here are invoked fresh per request rather than
//! held open across a conversation.

use crate::core::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use crate::core::config::CoreConfig;
use crate::core::error::CoreError;
use crate::core::event::EventSink;
use crate::core::metrics::{CallRecord, MetricsCollector};
use crate::core::response_cache::{compute_cache_key, ResponseCache};
use crate::core::types::{
    AgentMessage, AgentRole, CacheKey, ModelTier, RequestContext, ResponseLength, ResponseMetadata, StreamEvent,
};
use chrono::Utc;
use futures_util::stream::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Result of one [`Agent::process`] call.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    pub metadata: ResponseMetadata,
}

/// A single specialised LLM executor bound to one [`AgentRole`].
///
/// Holds no conversation state; every [`Agent::process`] call receives the
/// full [`RequestContext`] it needs and returns independently of prior calls.
pub struct Agent {
    role: AgentRole,
    client: Arc<dyn ClientWrapper>,
    tier: ModelTier,
    base_system_prompt: String,
    cache: Arc<ResponseCache>,
    metrics: Arc<MetricsCollector>,
    config: CoreConfig,
}

impl Agent {
    pub fn new(
        role: AgentRole,
        client: Arc<dyn ClientWrapper>,
        tier: ModelTier,
        base_system_prompt: String,
        cache: Arc<ResponseCache>,
        metrics: Arc<MetricsCollector>,
        config: CoreConfig,
    ) -> Self {
        Agent {
            role,
            client,
            tier,
            base_system_prompt,
            cache,
            metrics,
            config,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Render the system prompt for this role: name the role, then append
    /// the caller-supplied base prompt.
    fn render_system_prompt(&self, context: &RequestContext) -> String {
        let mut rendered = format!("You are the {} agent.\n", self.role);
        if let Some(phase) = &context.phase_name {
            rendered.push_str(&format!("Current phase: {}.\n", phase));
        }
        rendered.push_str(&self.base_system_prompt);
        rendered
    }

    /// Keep only the last `max_history_runs` turns, and append a compact
    /// summary marker for anything older than that window, rather than
    /// replaying the full history on every call.
    fn compact_history(&self, history: &[AgentMessage]) -> Vec<Message> {
        let keep = self.config.max_history_runs;
        let mut compacted = Vec::new();
        if history.len() > keep {
            let dropped = history.len() - keep;
            compacted.push(Message {
                role: Role::System,
                content: std::sync::Arc::from(
                    format!("[{} earlier turns omitted for brevity]", dropped).as_str(),
                ),
            });
        }
        let tail_start = history.len().saturating_sub(keep);
        for msg in &history[tail_start..] {
            compacted.push(Message {
                role: msg.role.into(),
                content: msg.content.clone(),
            });
        }
        compacted
    }

    /// Strip low-value filler prefixes and cap length. Long requests are
    /// truncated to 800 characters; truncation always happens at a
    /// whitespace boundary so words are never split mid-token.
    fn rewrite_query(&self, raw: &str) -> String {
        const LOW_VALUE_PREFIXES: &[&str] = &["please ", "can you ", "i would like you to ", "i want you to "];
        let mut rewritten = raw.trim().to_string();
        let lowered = rewritten.to_lowercase();
        for prefix in LOW_VALUE_PREFIXES {
            if lowered.starts_with(prefix) {
                rewritten = rewritten[prefix.len()..].to_string();
                break;
            }
        }
        truncate_at_boundary(&rewritten, 800)
    }

    /// Build the full message vector sent to the provider: system prompt,
    /// compacted history, knowledge/integration snippets folded into a
    /// single context message, then the rewritten user query.
    fn build_messages(&self, query: &str, context: &RequestContext) -> Vec<Message> {
        let mut messages = vec![Message {
            role: Role::System,
            content: std::sync::Arc::from(self.render_system_prompt(context).as_str()),
        }];
        messages.extend(self.compact_history(&context.conversation_history));

        if !context.knowledge_snippets.is_empty() || !context.integration_snippets.is_empty() {
            let mut context_block = String::from("Relevant context:\n");
            for snippet in &context.knowledge_snippets {
                context_block.push_str("- ");
                context_block.push_str(&truncate_at_boundary(&snippet.content, 500));
                context_block.push('\n');
            }
            for snippet in &context.integration_snippets {
                context_block.push_str("- [");
                context_block.push_str(&snippet.source);
                context_block.push_str("] ");
                context_block.push_str(&truncate_at_boundary(&snippet.content, 500));
                context_block.push('\n');
            }
            messages.push(Message {
                role: Role::System,
                content: std::sync::Arc::from(context_block.as_str()),
            });
        }

        messages.push(Message {
            role: Role::User,
            content: std::sync::Arc::from(self.rewrite_query(query).as_str()),
        });
        messages
    }

    fn context_fingerprint(&self, context: &RequestContext) -> String {
        let mut fingerprint = String::new();
        for (key, value) in &context.form_data {
            fingerprint.push_str(key);
            fingerprint.push('=');
            fingerprint.push_str(value);
            fingerprint.push(';');
        }
        for snippet in &context.knowledge_snippets {
            fingerprint.push_str(&snippet.content);
            fingerprint.push(';');
        }
        fingerprint
    }

    fn history_fingerprint(&self, context: &RequestContext) -> String {
        context
            .conversation_history
            .iter()
            .map(|m| m.content.as_ref())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Live cache lookup as a fully-formed [`AgentResponse`], or `None` on a
    /// miss or when caching is disabled for this agent's config.
    fn cached_hit(&self, cache_key: &CacheKey) -> Option<AgentResponse> {
        if !self.config.cache_enabled {
            return None;
        }
        self.cache.get(cache_key).map(|cached| {
            let mut metadata = cached.metadata;
            metadata.cache_hit = true;
            AgentResponse {
                content: cached.content,
                metadata,
            }
        })
    }

    /// Build the final [`ResponseMetadata`], record the call, and populate
    /// the cache. Shared by [`Agent::process`] and [`Agent::process_with_sink`]
    /// so both pipelines record identical metrics/cache entries regardless
    /// of whether the reply arrived as one block or as streamed chunks.
    fn finalize(
        &self,
        start: Instant,
        query: &str,
        context: &RequestContext,
        cache_key: CacheKey,
        content: String,
        usage: Option<TokenUsage>,
    ) -> AgentResponse {
        let metadata = ResponseMetadata {
            processing_time_ms: start.elapsed().as_millis() as u64,
            input_tokens: usage.as_ref().map(|u| u.input_tokens).unwrap_or(0),
            output_tokens: usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
            cache_hit: false,
            tool_calls: 0,
            system_context: None,
            system_prompt: Some(self.render_system_prompt(context)),
            user_prompt: Some(query.to_string()),
            rag_context: None,
            partial: false,
        };

        self.metrics.record_call(
            self.role,
            CallRecord {
                time_ms: metadata.processing_time_ms,
                cache_hit: false,
                tool_calls: 0,
                input_tokens: metadata.input_tokens,
                output_tokens: metadata.output_tokens,
            },
        );

        if self.config.cache_enabled {
            self.cache.set(
                cache_key,
                self.role,
                content.clone(),
                metadata.clone(),
                self.config.cache_ttl_seconds,
            );
        }

        AgentResponse { content, metadata }
    }

    /// Run the full pipeline: cache probe, invocation with a hard timeout,
    /// response-length enforcement, metrics recording, and cache population.
    pub async fn process(
        &self,
        query: &str,
        context: &RequestContext,
    ) -> Result<AgentResponse, CoreError> {
        let start = Instant::now();

        let cache_key = compute_cache_key(
            self.role,
            self.tier,
            query,
            &self.context_fingerprint(context),
            &self.history_fingerprint(context),
        );

        if let Some(hit) = self.cached_hit(&cache_key) {
            self.metrics.record_call(
                self.role,
                CallRecord {
                    time_ms: start.elapsed().as_millis() as u64,
                    cache_hit: true,
                    ..Default::default()
                },
            );
            return Ok(hit);
        }

        let messages = self.build_messages(query, context);

        let timeout = self.config.agent_response_timeout();
        let invocation = tokio::time::timeout(timeout, self.client.send_message(&messages)).await;

        let reply = match invocation {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                return Err(CoreError::PartialSynthesis {
                    agent: self.role,
                    cause: err.to_string(),
                })
            }
            Err(_) => {
                return Err(CoreError::AgentTimeout {
                    agent: self.role,
                    timeout_seconds: timeout.as_secs(),
                })
            }
        };

        let content = enforce_response_length(reply.content.as_ref(), context.response_length);
        let usage = self.client.get_last_usage().await;

        Ok(self.finalize(start, query, context, cache_key, content, usage))
    }

    /// Same pipeline as [`Agent::process`], but emits [`StreamEvent::AgentStart`],
    /// one or more [`StreamEvent::AgentChunk`]s, and [`StreamEvent::AgentComplete`]
    /// through `sink` as the call progresses. Attempts
    /// [`ClientWrapper::send_message_stream`] first for genuine per-token
    /// chunks; clients that inherit the trait's default `Ok(None)` fall back
    /// to a single full-text chunk once the reply arrives. `internal` marks
    /// the emitted events as belonging to a supporting agent rather than the
    /// primary synthesis call.
    pub async fn process_with_sink(
        &self,
        query: &str,
        context: &RequestContext,
        sink: &EventSink,
        internal: bool,
    ) -> Result<AgentResponse, CoreError> {
        let start = Instant::now();

        sink.emit(StreamEvent::AgentStart {
            seq: sink.next_seq(),
            agent: self.role,
            query: query.to_string(),
            progress: 0.0,
            internal,
            timestamp: Utc::now(),
        })
        .await;

        let cache_key = compute_cache_key(
            self.role,
            self.tier,
            query,
            &self.context_fingerprint(context),
            &self.history_fingerprint(context),
        );

        if let Some(hit) = self.cached_hit(&cache_key) {
            self.metrics.record_call(
                self.role,
                CallRecord {
                    time_ms: start.elapsed().as_millis() as u64,
                    cache_hit: true,
                    ..Default::default()
                },
            );
            sink.emit(StreamEvent::AgentChunk {
                seq: sink.next_seq(),
                agent: self.role,
                chunk: hit.content.clone(),
                progress: 1.0,
                timestamp: Utc::now(),
            })
            .await;
            sink.emit(StreamEvent::AgentComplete {
                seq: sink.next_seq(),
                agent: self.role,
                response: hit.content.clone(),
                metadata: hit.metadata.clone(),
                internal,
                timestamp: Utc::now(),
            })
            .await;
            return Ok(hit);
        }

        let messages = self.build_messages(query, context);
        let timeout = self.config.agent_response_timeout();

        let (content, usage) = match tokio::time::timeout(timeout, self.client.send_message_stream(&messages)).await {
            Ok(Ok(Some(mut stream))) => {
                let mut buffer = String::new();
                while let Some(next) = stream.next().await {
                    let chunk = next.map_err(|err| CoreError::PartialSynthesis {
                        agent: self.role,
                        cause: err.to_string(),
                    })?;
                    if !chunk.content.is_empty() {
                        buffer.push_str(&chunk.content);
                        sink.emit(StreamEvent::AgentChunk {
                            seq: sink.next_seq(),
                            agent: self.role,
                            chunk: chunk.content,
                            progress: 0.5,
                            timestamp: Utc::now(),
                        })
                        .await;
                    }
                }
                let content = enforce_response_length(&buffer, context.response_length);
                (content, self.client.get_last_usage().await)
            }
            Ok(Ok(None)) => {
                let content = self.send_once(&messages, timeout, context.response_length).await?;
                sink.emit(StreamEvent::AgentChunk {
                    seq: sink.next_seq(),
                    agent: self.role,
                    chunk: content.clone(),
                    progress: 1.0,
                    timestamp: Utc::now(),
                })
                .await;
                (content, self.client.get_last_usage().await)
            }
            Ok(Err(err)) => {
                return Err(CoreError::PartialSynthesis {
                    agent: self.role,
                    cause: err.to_string(),
                })
            }
            Err(_) => {
                return Err(CoreError::AgentTimeout {
                    agent: self.role,
                    timeout_seconds: timeout.as_secs(),
                })
            }
        };

        let response = self.finalize(start, query, context, cache_key, content, usage);
        sink.emit(StreamEvent::AgentComplete {
            seq: sink.next_seq(),
            agent: self.role,
            response: response.content.clone(),
            metadata: response.metadata.clone(),
            internal,
            timestamp: Utc::now(),
        })
        .await;
        Ok(response)
    }

    /// Non-streaming fallback shared by [`Agent::process_with_sink`] when the
    /// client has no streaming support of its own.
    async fn send_once(
        &self,
        messages: &[Message],
        timeout: std::time::Duration,
        response_length: ResponseLength,
    ) -> Result<String, CoreError> {
        let invocation = tokio::time::timeout(timeout, self.client.send_message(messages)).await;
        let reply = match invocation {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                return Err(CoreError::PartialSynthesis {
                    agent: self.role,
                    cause: err.to_string(),
                })
            }
            Err(_) => {
                return Err(CoreError::AgentTimeout {
                    agent: self.role,
                    timeout_seconds: timeout.as_secs(),
                })
            }
        };
        Ok(enforce_response_length(reply.content.as_ref(), response_length))
    }
}

fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(boundary) => truncated[..boundary].to_string(),
        None => truncated,
    }
}

/// Enforce the post-generation verbosity policy: 500 words for `Short`,
/// 1000 words for `Verbose`/`Default`.
fn enforce_response_length(content: &str, length: ResponseLength) -> String {
    let word_limit = match length {
        ResponseLength::Short => 500,
        ResponseLength::Default | ResponseLength::Verbose => 1000,
    };
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() <= word_limit {
        content.to_string()
    } else {
        words[..word_limit].join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_strips_low_value_prefix() {
        let agent = test_agent();
        assert_eq!(agent.rewrite_query("please add a dashboard"), "add a dashboard");
    }

    #[test]
    fn rewrite_truncates_at_word_boundary() {
        let agent = test_agent();
        let long_query = "word ".repeat(400);
        let rewritten = agent.rewrite_query(&long_query);
        assert!(rewritten.chars().count() <= 800);
        assert!(!rewritten.ends_with("wor"));
    }

    #[test]
    fn compact_history_marks_dropped_turns() {
        let agent = test_agent();
        let history: Vec<AgentMessage> = (0..10)
            .map(|i| AgentMessage {
                role: crate::core::types::MessageRole::User,
                content: std::sync::Arc::from(format!("turn {}", i).as_str()),
                timestamp: chrono::Utc::now(),
                agent_role: None,
            })
            .collect();
        let compacted = agent.compact_history(&history);
        assert!(compacted[0].content.contains("omitted"));
        assert_eq!(compacted.len(), 1 + agent.config.max_history_runs);
    }

    #[test]
    fn response_length_enforced() {
        let long_text = "word ".repeat(1200);
        let short = enforce_response_length(&long_text, ResponseLength::Short);
        assert_eq!(short.split_whitespace().count(), 500);
        let verbose = enforce_response_length(&long_text, ResponseLength::Verbose);
        assert_eq!(verbose.split_whitespace().count(), 1000);
    }

    struct NoopClient;

    #[async_trait::async_trait]
    impl ClientWrapper for NoopClient {
        async fn send_message(
            &self,
            _messages: &[Message],
        ) -> Result<Message, Box<dyn std::error::Error + Send + Sync>> {
            Ok(Message {
                role: Role::Assistant,
                content: std::sync::Arc::from("ok"),
            })
        }

        fn model_name(&self) -> &str {
            "noop"
        }
    }

    fn test_agent() -> Agent {
        Agent::new(
            AgentRole::Research,
            Arc::new(NoopClient),
            ModelTier::Fast,
            "Help with product research.".to_string(),
            Arc::new(ResponseCache::new()),
            Arc::new(MetricsCollector::new()),
            CoreConfig::default(),
        )
    }
}
