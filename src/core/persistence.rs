//! Storage seams the coordinator depends on but does not implement.
//!
//! The durable schema is intentionally out of scope here; what belongs in
//! this crate is the *trait boundary* the rest of the code programs
//! against, plus a simple in-memory double used by the test suite. A real
//! deployment supplies its own [`PersistenceReader`]/[`KnowledgeStore`]
//! backed by whatever store it runs.

use crate::core::types::{KnowledgeSnippet, PhaseOutput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;

/// Read-only access to prior phase outputs for a product, used by
/// [`crate::core::context_builder::ContextBuilder`].
#[async_trait]
pub trait PersistenceReader: Send + Sync {
    async fn previous_phase_outputs(
        &self,
        product_id: &str,
    ) -> Result<Vec<PhaseOutput>, Box<dyn Error + Send + Sync>>;
}

/// Similarity search over a product's knowledge base, used by
/// [`crate::core::knowledge_agent::KnowledgeAgent`].
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn query(
        &self,
        product_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<KnowledgeSnippet>, Box<dyn Error + Send + Sync>>;
}

/// In-memory [`PersistenceReader`] + [`KnowledgeStore`] double, seeded with
/// fixed data. Used by integration tests and as a default when no external
/// store is wired up.
#[derive(Default)]
pub struct InMemoryStore {
    phase_outputs: Mutex<HashMap<String, Vec<PhaseOutput>>>,
    knowledge: Mutex<HashMap<String, Vec<KnowledgeSnippet>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_phase_outputs(&self, product_id: &str, outputs: Vec<PhaseOutput>) {
        self.phase_outputs
            .lock()
            .unwrap()
            .insert(product_id.to_string(), outputs);
    }

    pub fn seed_knowledge(&self, product_id: &str, snippets: Vec<KnowledgeSnippet>) {
        self.knowledge
            .lock()
            .unwrap()
            .insert(product_id.to_string(), snippets);
    }
}

#[async_trait]
impl PersistenceReader for InMemoryStore {
    async fn previous_phase_outputs(
        &self,
        product_id: &str,
    ) -> Result<Vec<PhaseOutput>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .phase_outputs
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn query(
        &self,
        product_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<KnowledgeSnippet>, Box<dyn Error + Send + Sync>> {
        let all = self
            .knowledge
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .unwrap_or_default();
        let query_lower = query.to_lowercase();
        let mut scored: Vec<KnowledgeSnippet> = all
            .into_iter()
            .map(|mut snippet| {
                let overlap = jaccard_overlap(&query_lower, &snippet.content.to_lowercase());
                snippet.score = overlap;
                snippet
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn jaccard_overlap(a: &str, b: &str) -> f32 {
    use std::collections::HashSet;
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}
