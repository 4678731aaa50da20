//! Knowledge-retrieval specialised agent.
//!
//! Runs a top-K similarity query against the product's knowledge base,
//! attaches the results to the context, then delegates to the base
//! [`Agent`] pipeline rather than re-implementing the LLM round trip. An
//! empty result set is not an error: it degrades to a `skipped` response so
//! the Coordinator can proceed without this agent's contribution.

use crate::core::agent::{Agent, AgentResponse};
use crate::core::error::CoreError;
use crate::core::persistence::KnowledgeStore;
use crate::core::types::RequestContext;
use std::sync::Arc;

const TOP_K: usize = 5;

/// Wraps a base [`Agent`] (role [`crate::core::types::AgentRole::Knowledge`])
/// with a retrieval step run before invocation.
pub struct KnowledgeAgent {
    inner: Agent,
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeAgent {
    pub fn new(inner: Agent, store: Arc<dyn KnowledgeStore>) -> Self {
        KnowledgeAgent { inner, store }
    }

    /// Retrieve snippets for `query`, attach them to a cloned context, and
    /// run the base agent. Returns a `skipped` marker response when either
    /// no `product_id` is present or the query returns no snippets.
    ///
    /// On success, also returns the retrieved snippets so the caller can
    /// fold them into the shared [`RequestContext`] passed on to the
    /// primary agent's synthesis step.
    pub async fn process(
        &self,
        query: &str,
        context: &RequestContext,
    ) -> Result<(AgentResponse, Vec<crate::core::types::KnowledgeSnippet>), CoreError> {
        let Some(product_id) = context.product_id.as_deref() else {
            return Ok((skipped_response("no product_id in context"), Vec::new()));
        };

        let snippets = self
            .store
            .query(product_id, query, TOP_K)
            .await
            .map_err(|e| CoreError::KnowledgeUnavailable(e.to_string()))?;

        if snippets.is_empty() {
            return Ok((skipped_response("no matching knowledge snippets"), Vec::new()));
        }

        let mut enriched = context.clone();
        enriched.knowledge_snippets = snippets.clone();
        let response = self.inner.process(query, &enriched).await?;
        Ok((response, snippets))
    }
}

fn skipped_response(reason: &str) -> AgentResponse {
    AgentResponse {
        content: String::new(),
        metadata: crate::core::types::ResponseMetadata {
            partial: true,
            rag_context: Some(format!("skipped: {}", reason)),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::Agent;
    use crate::core::client_wrapper::{ClientWrapper, Message, Role};
    use crate::core::config::CoreConfig;
    use crate::core::metrics::MetricsCollector;
    use crate::core::persistence::InMemoryStore;
    use crate::core::response_cache::ResponseCache;
    use crate::core::types::{AgentRole, KnowledgeSnippet, ModelTier};

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

    fn test_knowledge_agent(store: Arc<InMemoryStore>) -> KnowledgeAgent {
        let base = Agent::new(
            AgentRole::Knowledge,
            Arc::new(NoopClient),
            ModelTier::Fast,
            "Summarise relevant knowledge.".into(),
            Arc::new(ResponseCache::new()),
            Arc::new(MetricsCollector::new()),
            CoreConfig::default(),
        );
        KnowledgeAgent::new(base, store)
    }

    #[tokio::test]
    async fn missing_product_id_skips() {
        let store = Arc::new(InMemoryStore::new());
        let agent = test_knowledge_agent(store);
        let context = RequestContext::default();
        let (response, snippets) = agent.process("pricing", &context).await.unwrap();
        assert!(response.metadata.partial);
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn no_matches_skips() {
        let store = Arc::new(InMemoryStore::new());
        let agent = test_knowledge_agent(store);
        let context = RequestContext {
            product_id: Some("p1".into()),
            ..Default::default()
        };
        let (response, snippets) = agent.process("pricing", &context).await.unwrap();
        assert!(response.metadata.partial);
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn matches_attach_and_synthesize() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_knowledge(
            "p1",
            vec![KnowledgeSnippet {
                content: "our pricing model is usage based".into(),
                metadata: Default::default(),
                score: 0.0,
            }],
        );
        let agent = test_knowledge_agent(store);
        let context = RequestContext {
            product_id: Some("p1".into()),
            ..Default::default()
        };
        let (response, snippets) = agent.process("pricing model", &context).await.unwrap();
        assert_eq!(response.content, "synthesised");
        assert!(!response.metadata.partial);
        assert_eq!(snippets.len(), 1);
    }
}
