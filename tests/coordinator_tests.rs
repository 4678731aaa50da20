//! End-to-end coordinator scenarios, exercising the fan-out/fan-in pipeline
//! against in-memory `ClientWrapper`/`PersistenceReader`/`KnowledgeStore`
//! doubles rather than real providers.

use async_trait::async_trait;
use pmcopilot_core::core::agent::Agent;
use pmcopilot_core::core::client_wrapper::{ClientWrapper, Message, Role};
use pmcopilot_core::core::config::CoreConfig;
use pmcopilot_core::core::context_builder::{ContextBuilder, ContextInput};
use pmcopilot_core::core::coordinator::{CancellationToken, Coordinator, CoordinatorRequest};
use pmcopilot_core::core::event::NullEventHandler;
use pmcopilot_core::core::integration_agent::IntegrationAgent;
use pmcopilot_core::core::knowledge_agent::KnowledgeAgent;
use pmcopilot_core::core::metrics::MetricsCollector;
use pmcopilot_core::core::persistence::InMemoryStore;
use pmcopilot_core::core::provider_registry::{ProviderCredential, ProviderRegistry};
use pmcopilot_core::core::response_cache::ResponseCache;
use pmcopilot_core::core::types::{AgentRole, KnowledgeSnippet, Provider};
use std::collections::HashMap;
use std::sync::Arc;

struct EchoClient;

#[async_trait]
impl ClientWrapper for EchoClient {
    async fn send_message(
        &self,
        messages: &[Message],
    ) -> Result<Message, Box<dyn std::error::Error + Send + Sync>> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.to_string())
            .unwrap_or_default();
        Ok(Message {
            role: Role::Assistant,
            content: std::sync::Arc::from(format!("synthesised: {}", last_user).as_str()),
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn build_coordinator(store: Arc<InMemoryStore>) -> Coordinator {
    let registry = Arc::new(ProviderRegistry::new());
    registry.update_key(Provider::OpenAI, ProviderCredential::new("test-key".into()));
    registry.update_key(Provider::Claude, ProviderCredential::new("test-key".into()));
    registry.set_tier_override(pmcopilot_core::core::types::ModelTier::Fast, Arc::new(EchoClient));
    registry.set_tier_override(pmcopilot_core::core::types::ModelTier::Standard, Arc::new(EchoClient));
    registry.set_tier_override(pmcopilot_core::core::types::ModelTier::Premium, Arc::new(EchoClient));

    let cache = Arc::new(ResponseCache::new());
    let metrics = Arc::new(MetricsCollector::new());
    let config = CoreConfig::default();
    let context_builder = ContextBuilder::new(store.clone());

    let knowledge_base = Agent::new(
        AgentRole::Knowledge,
        Arc::new(EchoClient),
        pmcopilot_core::core::types::ModelTier::Fast,
        "Summarise knowledge.".into(),
        cache.clone(),
        metrics.clone(),
        config.clone(),
    );
    let knowledge_agent = KnowledgeAgent::new(knowledge_base, store.clone());

    let integration_base = Agent::new(
        AgentRole::Integration,
        Arc::new(EchoClient),
        pmcopilot_core::core::types::ModelTier::Fast,
        "Summarise integrations.".into(),
        cache.clone(),
        metrics.clone(),
        config.clone(),
    );
    let integration_agent = IntegrationAgent::new(integration_base, Vec::new());

    let mut prompts = HashMap::new();
    prompts.insert(AgentRole::Research, "You do market research.".to_string());
    prompts.insert(AgentRole::Ideation, "You generate product ideas.".to_string());

    Coordinator::new(
        registry,
        cache,
        metrics,
        config,
        context_builder,
        knowledge_agent,
        integration_agent,
        prompts,
    )
}

#[tokio::test]
async fn trivial_negative_short_circuits_with_no_agent_calls() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(store);
    let request = CoordinatorRequest {
        query: "no".into(),
        explicit_role: None,
        context: ContextInput::default(),
    };
    let response = coordinator
        .handle(request, Arc::new(NullEventHandler), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.interactions.is_empty());
    assert!(response.content.to_lowercase().contains("hold off"));
}

#[tokio::test]
async fn market_research_fan_out_includes_knowledge_not_ideation() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_knowledge(
        "p1",
        vec![KnowledgeSnippet {
            content: "market trends show saas growth in pricing tools".into(),
            metadata: Default::default(),
            score: 0.0,
        }],
    );
    let coordinator = build_coordinator(store);
    let request = CoordinatorRequest {
        query: "What are the market trends and competitive landscape?".into(),
        explicit_role: None,
        context: ContextInput {
            product_id: Some("p1".into()),
            phase_name: Some("Market Research".into()),
            ..Default::default()
        },
    };
    let response = coordinator
        .handle(request, Arc::new(NullEventHandler), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.interactions.iter().any(|i| i.to_role == AgentRole::Knowledge));
    assert!(response.content.starts_with("synthesised:"));
}

#[tokio::test]
async fn requirements_phase_excludes_ideation_headings() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(store);
    let request = CoordinatorRequest {
        query: "What are the functional requirements?".into(),
        explicit_role: None,
        context: ContextInput {
            phase_id: Some("requirements".into()),
            ..Default::default()
        },
    };
    let response = coordinator
        .handle(request, Arc::new(NullEventHandler), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!response
        .interactions
        .iter()
        .any(|i| i.to_role == AgentRole::Ideation));
}

#[tokio::test]
async fn explicit_role_request_is_honoured() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(store);
    let request = CoordinatorRequest {
        query: "draft a plan".into(),
        explicit_role: Some(AgentRole::Ideation),
        context: ContextInput::default(),
    };
    let response = coordinator
        .handle(request, Arc::new(NullEventHandler), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.content.contains("draft a plan"));
}

#[tokio::test]
async fn cancelled_before_dispatch_returns_cancellation_error() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(store);
    let token = CancellationToken::new();
    token.cancel();
    let request = CoordinatorRequest {
        query: "anything substantial to route".into(),
        explicit_role: None,
        context: ContextInput::default(),
    };
    let result = coordinator.handle(request, Arc::new(NullEventHandler), &token).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn form_field_help_takes_the_fast_path_with_no_supporting_agents() {
    let store = Arc::new(InMemoryStore::new());
    let coordinator = build_coordinator(store);
    let request = CoordinatorRequest {
        query: "what should I put in this field?".into(),
        explicit_role: None,
        context: ContextInput {
            phase_id: Some("requirements".into()),
            current_field: Some("acceptance_criteria".into()),
            ..Default::default()
        },
    };
    let response = coordinator
        .handle(request, Arc::new(NullEventHandler), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.interactions.is_empty());
    assert!(response.content.starts_with("synthesised:"));
}
