//! Data model shared across the orchestration core.
//!
//! These types are the nouns every other module in [`crate::core`] operates
//! on: the closed [`AgentRole`]/[`ModelTier`] enums used as routing keys, the
//! per-request [`RequestContext`], and the cache/metrics/job records that
//! accumulate as a request flows through the [`crate::core::coordinator::Coordinator`].

use crate::core::client_wrapper::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Routing key and metrics label for every specialised LLM executor.
///
/// Stable across restarts — persisted job records and metrics snapshots key
/// on this enum, so variants are never renumbered, only added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Ideation,
    Research,
    Analysis,
    Validation,
    Strategy,
    Requirements,
    Summary,
    Scoring,
    Export,
    Knowledge,
    Integration,
}

impl AgentRole {
    /// Every variant, in declaration order. Used by
    /// [`crate::core::metrics::MetricsCollector::snapshot_all`] to report a
    /// total-over-the-closed-enum view even for roles with zero calls.
    pub const ALL: [AgentRole; 11] = [
        AgentRole::Ideation,
        AgentRole::Research,
        AgentRole::Analysis,
        AgentRole::Validation,
        AgentRole::Strategy,
        AgentRole::Requirements,
        AgentRole::Summary,
        AgentRole::Scoring,
        AgentRole::Export,
        AgentRole::Knowledge,
        AgentRole::Integration,
    ];

    /// Lowercase identifier used in stream events and log lines (e.g. `"research"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Ideation => "ideation",
            AgentRole::Research => "research",
            AgentRole::Analysis => "analysis",
            AgentRole::Validation => "validation",
            AgentRole::Strategy => "strategy",
            AgentRole::Requirements => "requirements",
            AgentRole::Summary => "summary",
            AgentRole::Scoring => "scoring",
            AgentRole::Export => "export",
            AgentRole::Knowledge => "knowledge",
            AgentRole::Integration => "integration",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latency/cost tier resolved to a concrete `(Provider, ModelId, TokenLimit)`
/// triple by the [`crate::core::provider_registry::ProviderRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTier {
    Fast,
    Standard,
    Premium,
}

/// Identifies a configured LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    OpenAI,
    Claude,
    Grok,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::Grok => "grok",
            Provider::Gemini => "gemini",
        }
    }
}

/// One chat message accumulated in a [`RequestContext`].
///
/// Immutable once emitted — nothing downstream of [`crate::core::context_builder::ContextBuilder`]
/// mutates an already-constructed `AgentMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: MessageRole,
    pub content: Arc<str>,
    pub timestamp: DateTime<Utc>,
    pub agent_role: Option<AgentRole>,
}

/// Serialisable mirror of [`crate::core::client_wrapper::Role`].
///
/// Kept distinct from `Role` because `Role` is not `Serialize` (it lives in
/// the provider-facing client layer) while `AgentMessage` crosses the
/// persistence/streaming boundary and must serialise stably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Assistant,
            MessageRole::System => Role::System,
        }
    }
}

/// A knowledge-base snippet returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

/// A document retrieved by an [`crate::core::integration_agent::IntegrationAgent`] adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationSnippet {
    pub content: String,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

/// Per-request assembly built once by [`crate::core::context_builder::ContextBuilder`]
/// and never mutated afterwards. Agents receive it by shared reference.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub product_id: Option<String>,
    pub phase_id: Option<String>,
    pub phase_name: Option<String>,
    pub current_field: Option<String>,
    pub form_data: BTreeMap<String, String>,
    pub conversation_history: Vec<AgentMessage>,
    pub knowledge_snippets: Vec<KnowledgeSnippet>,
    pub integration_snippets: Vec<IntegrationSnippet>,
    pub previous_phase_outputs: Vec<PhaseOutput>,
    pub ideation_snippets: Vec<String>,
    pub user_context: BTreeMap<String, String>,
    pub response_length: ResponseLength,
}

/// Desired verbosity of the final synthesised response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseLength {
    #[default]
    Default,
    Short,
    Verbose,
}

/// One completed phase's recorded form data + generated artifact, ordered by phase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutput {
    pub phase_id: String,
    pub phase_name: String,
    pub order: i32,
    pub form_data: BTreeMap<String, String>,
    pub generated_content: Option<String>,
}

/// Deterministic digest identifying a cacheable `(role, tier, context, history)` tuple.
///
/// Computed by [`crate::core::response_cache::compute_cache_key`]; the inner
/// string is a hex-encoded SHA-256 digest so two keys are equal iff their
/// normalised inputs were byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(pub String);

/// A previously computed agent response, stored by [`crate::core::response_cache::ResponseCache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub key: CacheKey,
    pub role: AgentRole,
    pub content: String,
    pub metadata: ResponseMetadata,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CachedResponse {
    /// `stored_at + ttl ≥ now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        let expires = self.stored_at + chrono::Duration::seconds(self.ttl_seconds as i64);
        expires >= now
    }
}

/// Metadata attached to every [`AgentResponse`](crate::core::agent::AgentResponse).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: u64,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub cache_hit: bool,
    pub tool_calls: usize,
    pub system_context: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub rag_context: Option<String>,
    pub partial: bool,
}

/// Per-`AgentRole` running counters. `AvgTime` is always derived, never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub calls: u64,
    pub total_time_ms: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub tool_calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl AgentMetrics {
    /// `TotalTime / Calls`, or `0` when there have been no calls yet.
    pub fn avg_time_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.calls as f64
        }
    }
}

/// One agent-to-agent call recorded in the Coordinator's bounded history ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub from_role: Option<AgentRole>,
    pub to_role: AgentRole,
    pub query: String,
    pub response: String,
    pub metadata: ResponseMetadata,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle status of an asynchronous [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A durable unit of work tracked by [`crate::core::job_manager::JobManager`].
///
/// Lifecycle: `Pending -> Processing -> (Completed | Failed)`. Terminal
/// states (`Completed`/`Failed`) are never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f32,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub request_query: String,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// A single event in the Coordinator's streaming protocol.
///
/// Every variant carries a monotonically increasing `seq` within one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    AgentStart {
        seq: u64,
        agent: AgentRole,
        query: String,
        progress: f32,
        internal: bool,
        timestamp: DateTime<Utc>,
    },
    AgentChunk {
        seq: u64,
        agent: AgentRole,
        chunk: String,
        progress: f32,
        timestamp: DateTime<Utc>,
    },
    AgentComplete {
        seq: u64,
        agent: AgentRole,
        response: String,
        metadata: ResponseMetadata,
        internal: bool,
        timestamp: DateTime<Utc>,
    },
    Interaction {
        seq: u64,
        interaction: Interaction,
        timestamp: DateTime<Utc>,
    },
    Progress {
        seq: u64,
        progress: f32,
        message: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        seq: u64,
        error: String,
        agent: Option<AgentRole>,
        error_type: String,
        timestamp: DateTime<Utc>,
    },
    Complete {
        seq: u64,
        response: String,
        interactions: Vec<Interaction>,
        metadata: ResponseMetadata,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_role_all_covers_every_variant() {
        assert_eq!(AgentRole::ALL.len(), 11);
        assert!(AgentRole::ALL.contains(&AgentRole::Integration));
    }

    #[test]
    fn cached_response_respects_ttl() {
        let now = Utc::now();
        let resp = CachedResponse {
            key: CacheKey("abc".into()),
            role: AgentRole::Research,
            content: "x".into(),
            metadata: ResponseMetadata::default(),
            stored_at: now - chrono::Duration::seconds(10),
            ttl_seconds: 5,
        };
        assert!(!resp.is_live(now));

        let fresh = CachedResponse {
            stored_at: now,
            ttl_seconds: 60,
            ..resp
        };
        assert!(fresh.is_live(now));
    }

    #[test]
    fn avg_time_derived_not_stored() {
        let m = AgentMetrics {
            calls: 4,
            total_time_ms: 800,
            ..Default::default()
        };
        assert_eq!(m.avg_time_ms(), 200.0);
    }
}
