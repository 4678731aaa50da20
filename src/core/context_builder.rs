//! Request context assembly.
//!
//! Builds one [`RequestContext`] per incoming request from persisted phase
//! outputs, conversation history, current phase form data, and a lexical
//! vocabulary extraction pass. The result is idempotent: identical inputs
//! produce byte-identical context fingerprints — ordering is always by
//! phase `order` (for previous outputs) and by `BTreeMap` key order (for
//! form data), never by retrieval order, so [`crate::core::response_cache`]
//! keys stay stable across repeated calls with the same inputs.

use crate::core::persistence::PersistenceReader;
use crate::core::types::{AgentMessage, KnowledgeSnippet, MessageRole, RequestContext, ResponseLength};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Assembles [`RequestContext`] values from the persisted-state boundary.
pub struct ContextBuilder {
    persistence: Arc<dyn PersistenceReader>,
}

/// Caller-supplied inputs for one request; everything retrievable from
/// storage (previous phase outputs) is filled in by [`ContextBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct ContextInput {
    pub product_id: Option<String>,
    pub phase_id: Option<String>,
    pub phase_name: Option<String>,
    pub current_field: Option<String>,
    pub form_data: BTreeMap<String, String>,
    pub conversation_history: Vec<AgentMessage>,
    pub knowledge_snippets: Vec<KnowledgeSnippet>,
    pub user_context: BTreeMap<String, String>,
    pub response_length: ResponseLength,
}

impl ContextBuilder {
    pub fn new(persistence: Arc<dyn PersistenceReader>) -> Self {
        ContextBuilder { persistence }
    }

    /// Assemble a [`RequestContext`], excluding `current_field` from
    /// `form_data` so the agent never sees the value of the field the user
    /// is actively editing — it receives the intent to constrain that field
    /// via `current_field` instead.
    pub async fn build(&self, input: ContextInput) -> RequestContext {
        let mut previous_phase_outputs = Vec::new();
        if let Some(product_id) = &input.product_id {
            if let Ok(outputs) = self.persistence.previous_phase_outputs(product_id).await {
                previous_phase_outputs = outputs;
            }
        }
        previous_phase_outputs.sort_by_key(|o| o.order);

        let mut form_data = input.form_data.clone();
        if let Some(field) = &input.current_field {
            form_data.remove(field);
        }

        let ideation_snippets = extract_vocabulary(&input.conversation_history);

        RequestContext {
            product_id: input.product_id,
            phase_id: input.phase_id,
            phase_name: input.phase_name,
            current_field: input.current_field,
            form_data,
            conversation_history: input.conversation_history,
            knowledge_snippets: input.knowledge_snippets,
            integration_snippets: Vec::new(),
            previous_phase_outputs,
            ideation_snippets,
            user_context: input.user_context,
            response_length: input.response_length,
        }
    }
}

/// Fixed vocabulary that marks a user turn as carrying ideation-relevant
/// substance, rather than small talk or routine phase navigation.
const IDEATION_VOCABULARY: &[&str] = &[
    "problem",
    "solution",
    "feature",
    "persona",
    "pain point",
    "value proposition",
    "user need",
    "workflow",
    "use case",
    "idea",
];

/// Scan USER-authored turns only (assistant and system turns never
/// contribute) for messages that mention at least one ideation-vocabulary
/// term, and collect those messages verbatim for downstream ideation
/// prompts — this is a message-level filter, not a word extractor.
fn extract_vocabulary(history: &[AgentMessage]) -> Vec<String> {
    history
        .iter()
        .filter(|message| message.role == MessageRole::User)
        .filter_map(|message| {
            let lower = message.content.to_lowercase();
            IDEATION_VOCABULARY
                .iter()
                .any(|term| lower.contains(term))
                .then(|| message.content.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::InMemoryStore;
    use crate::core::types::{MessageRole, PhaseOutput};

    #[tokio::test]
    async fn current_field_excluded_from_form_data() {
        let store = Arc::new(InMemoryStore::new());
        let builder = ContextBuilder::new(store);
        let mut form_data = BTreeMap::new();
        form_data.insert("title".to_string(), "draft title".to_string());
        form_data.insert("summary".to_string(), "draft summary".to_string());

        let context = builder
            .build(ContextInput {
                current_field: Some("title".into()),
                form_data,
                ..Default::default()
            })
            .await;

        assert!(!context.form_data.contains_key("title"));
        assert!(context.form_data.contains_key("summary"));
    }

    #[tokio::test]
    async fn previous_phase_outputs_sorted_by_order() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_phase_outputs(
            "p1",
            vec![
                PhaseOutput {
                    phase_id: "b".into(),
                    phase_name: "Phase B".into(),
                    order: 2,
                    form_data: Default::default(),
                    generated_content: None,
                },
                PhaseOutput {
                    phase_id: "a".into(),
                    phase_name: "Phase A".into(),
                    order: 1,
                    form_data: Default::default(),
                    generated_content: None,
                },
            ],
        );
        let builder = ContextBuilder::new(store);
        let context = builder
            .build(ContextInput {
                product_id: Some("p1".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(context.previous_phase_outputs[0].phase_id, "a");
        assert_eq!(context.previous_phase_outputs[1].phase_id, "b");
    }

    #[tokio::test]
    async fn identical_inputs_produce_identical_context() {
        let store = Arc::new(InMemoryStore::new());
        let builder = ContextBuilder::new(store);
        let history = vec![AgentMessage {
            role: MessageRole::User,
            content: std::sync::Arc::from("I want a pricing dashboard"),
            timestamp: chrono::Utc::now(),
            agent_role: None,
        }];
        let a = builder
            .build(ContextInput {
                conversation_history: history.clone(),
                ..Default::default()
            })
            .await;
        let b = builder
            .build(ContextInput {
                conversation_history: history,
                ..Default::default()
            })
            .await;
        assert_eq!(a.ideation_snippets, b.ideation_snippets);
    }

    #[tokio::test]
    async fn vocabulary_extraction_filters_to_user_messages_with_ideation_terms() {
        let store = Arc::new(InMemoryStore::new());
        let builder = ContextBuilder::new(store);
        let history = vec![
            AgentMessage {
                role: MessageRole::Assistant,
                content: std::sync::Arc::from("What problem are we solving for?"),
                timestamp: chrono::Utc::now(),
                agent_role: None,
            },
            AgentMessage {
                role: MessageRole::User,
                content: std::sync::Arc::from("The core problem is onboarding drop-off"),
                timestamp: chrono::Utc::now(),
                agent_role: None,
            },
            AgentMessage {
                role: MessageRole::User,
                content: std::sync::Arc::from("what's the weather today"),
                timestamp: chrono::Utc::now(),
                agent_role: None,
            },
        ];
        let context = builder
            .build(ContextInput {
                conversation_history: history,
                ..Default::default()
            })
            .await;
        assert_eq!(context.ideation_snippets.len(), 1);
        assert!(context.ideation_snippets[0].contains("onboarding drop-off"));
    }
}
