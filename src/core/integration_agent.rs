//! External-tool integration specialised agent.
//!
//! Keyword-matches the query against a small set of configured adapters
//! (issue tracker, repository, wiki) and fetches supporting documents before
//! delegating to the base [`Agent`]. Adapter failures are non-fatal — they
//! degrade to a skip rather than failing the whole request, logged rather
//! than propagated.

use crate::core::agent::{Agent, AgentResponse};
use crate::core::error::CoreError;
use crate::core::types::{IntegrationSnippet, RequestContext};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

/// One external system an [`IntegrationAgent`] can pull supporting documents from.
#[async_trait]
pub trait IntegrationSource: Send + Sync {
    /// Keywords that, when present in the query, select this source.
    fn keywords(&self) -> &[&str];

    /// Human-readable source name attached to every returned snippet.
    fn name(&self) -> &str;

    async fn fetch(&self, query: &str) -> Result<Vec<IntegrationSnippet>, Box<dyn Error + Send + Sync>>;
}

/// Wraps a base [`Agent`] (role [`crate::core::types::AgentRole::Integration`])
/// with keyword-driven adapter selection run before invocation.
pub struct IntegrationAgent {
    inner: Agent,
    sources: Vec<Arc<dyn IntegrationSource>>,
}

impl IntegrationAgent {
    pub fn new(inner: Agent, sources: Vec<Arc<dyn IntegrationSource>>) -> Self {
        IntegrationAgent { inner, sources }
    }

    fn matching_sources(&self, query: &str) -> Vec<&Arc<dyn IntegrationSource>> {
        let lower = query.to_lowercase();
        self.sources
            .iter()
            .filter(|source| source.keywords().iter().any(|kw| lower.contains(kw)))
            .collect()
    }

    pub async fn process(&self, query: &str, context: &RequestContext) -> Result<AgentResponse, CoreError> {
        let matched = self.matching_sources(query);
        if matched.is_empty() {
            return Ok(AgentResponse {
                content: String::new(),
                metadata: crate::core::types::ResponseMetadata {
                    partial: true,
                    rag_context: Some("skipped: no matching integration source".into()),
                    ..Default::default()
                },
            });
        }

        let mut snippets = Vec::new();
        for source in matched {
            match source.fetch(query).await {
                Ok(found) => snippets.extend(found),
                Err(err) => {
                    log::warn!(
                        "integration source '{}' failed, degrading to skip: {}",
                        source.name(),
                        err
                    );
                }
            }
        }

        if snippets.is_empty() {
            return Ok(AgentResponse {
                content: String::new(),
                metadata: crate::core::types::ResponseMetadata {
                    partial: true,
                    rag_context: Some("skipped: all integration sources failed".into()),
                    ..Default::default()
                },
            });
        }

        let mut enriched = context.clone();
        enriched.integration_snippets = snippets;
        self.inner.process(query, &enriched).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client_wrapper::{ClientWrapper, Message, Role};
    use crate::core::config::CoreConfig;
    use crate::core::metrics::MetricsCollector;
    use crate::core::response_cache::ResponseCache;
    use crate::core::types::{AgentRole, ModelTier};

    struct NoopClient;

    #[async_trait::async_trait]
    impl ClientWrapper for NoopClient {
        async fn send_message(
            &self,
            _messages: &[Message],
        ) -> Result<Message, Box<dyn std::error::Error + Send + Sync>> {
            Ok(Message {
                role: Role::Assistant,
                content: std::sync::Arc::from("synthesised"),
            })
        }

        fn model_name(&self) -> &str {
            "noop"
        }
    }

    struct FailingSource;

    #[async_trait]
    impl IntegrationSource for FailingSource {
        fn keywords(&self) -> &[&str] {
            &["ticket", "issue"]
        }

        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _query: &str) -> Result<Vec<IntegrationSnippet>, Box<dyn Error + Send + Sync>> {
            Err("connection refused".into())
        }
    }

    struct WorkingSource;

    #[async_trait]
    impl IntegrationSource for WorkingSource {
        fn keywords(&self) -> &[&str] {
            &["repo", "repository"]
        }

        fn name(&self) -> &str {
            "working"
        }

        async fn fetch(&self, _query: &str) -> Result<Vec<IntegrationSnippet>, Box<dyn Error + Send + Sync>> {
            Ok(vec![IntegrationSnippet {
                content: "README excerpt".into(),
                source: "working".into(),
                metadata: Default::default(),
            }])
        }
    }

    fn test_agent(sources: Vec<Arc<dyn IntegrationSource>>) -> IntegrationAgent {
        let base = Agent::new(
            AgentRole::Integration,
            Arc::new(NoopClient),
            ModelTier::Fast,
            "Summarise external context.".into(),
            Arc::new(ResponseCache::new()),
            Arc::new(MetricsCollector::new()),
            CoreConfig::default(),
        );
        IntegrationAgent::new(base, sources)
    }

    #[tokio::test]
    async fn no_keyword_match_skips() {
        let agent = test_agent(vec![Arc::new(WorkingSource)]);
        let response = agent.process("what's the weather", &RequestContext::default()).await.unwrap();
        assert!(response.metadata.partial);
    }

    #[tokio::test]
    async fn failing_source_degrades_to_skip() {
        let agent = test_agent(vec![Arc::new(FailingSource)]);
        let response = agent.process("open an issue ticket", &RequestContext::default()).await.unwrap();
        assert!(response.metadata.partial);
    }

    #[tokio::test]
    async fn working_source_synthesizes() {
        let agent = test_agent(vec![Arc::new(WorkingSource)]);
        let response = agent
            .process("what's in the repository", &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(response.content, "synthesised");
    }
}
