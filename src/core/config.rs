//! Runtime configuration for the orchestration core.
//!
//! A plain struct with a `Default` impl and an `from_env()` constructor that
//! reads `std::env::var`. No TOML, YAML, or other config-file parsing
//! dependency is introduced — every knob here is an environment variable
//! with a documented default.

use crate::core::types::ModelTier;
use std::time::Duration;

/// Process-wide tunables for the coordinator and its component agents.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Number of prior turns kept verbatim when compacting conversation history.
    pub max_history_runs: usize,
    /// Maximum number of tool-call records replayed from history into a fresh prompt.
    pub max_tool_calls_from_history: usize,
    /// Soft cap on reasoning steps an agent pipeline will perform before forcing a synthesis.
    pub max_reasoning_steps: usize,
    /// Whether the response cache is consulted/populated at all.
    pub cache_enabled: bool,
    /// Default time-to-live for cache entries.
    pub cache_ttl_seconds: u64,
    /// Timeout applied to a single tool invocation.
    pub tool_call_timeout_seconds: u64,
    /// Hard timeout applied to a single agent invocation.
    pub agent_response_timeout_seconds: u64,
    /// Default model tier used when a request doesn't escalate to Premium.
    pub model_tier: ModelTier,
    /// Default response verbosity, see [`crate::core::types::ResponseLength`].
    pub response_length: crate::core::types::ResponseLength,
    /// Whether outbound HTTP clients verify TLS certificates. Disabling this
    /// is only ever appropriate in local development against self-signed endpoints.
    pub verify_ssl: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            max_history_runs: 5,
            max_tool_calls_from_history: 3,
            max_reasoning_steps: 6,
            cache_enabled: true,
            cache_ttl_seconds: 3600,
            tool_call_timeout_seconds: 30,
            agent_response_timeout_seconds: 1800,
            model_tier: ModelTier::Standard,
            response_length: crate::core::types::ResponseLength::Default,
            verify_ssl: true,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to
    /// [`CoreConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = CoreConfig::default();
        CoreConfig {
            max_history_runs: env_usize("PMCOPILOT_MAX_HISTORY_RUNS", defaults.max_history_runs),
            max_tool_calls_from_history: env_usize(
                "PMCOPILOT_MAX_TOOL_CALLS_FROM_HISTORY",
                defaults.max_tool_calls_from_history,
            ),
            max_reasoning_steps: env_usize(
                "PMCOPILOT_MAX_REASONING_STEPS",
                defaults.max_reasoning_steps,
            ),
            cache_enabled: env_bool("PMCOPILOT_CACHE_ENABLED", defaults.cache_enabled),
            cache_ttl_seconds: env_u64("PMCOPILOT_CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
            tool_call_timeout_seconds: env_u64(
                "PMCOPILOT_TOOL_CALL_TIMEOUT_SECONDS",
                defaults.tool_call_timeout_seconds,
            ),
            agent_response_timeout_seconds: env_u64(
                "PMCOPILOT_AGENT_RESPONSE_TIMEOUT_SECONDS",
                defaults.agent_response_timeout_seconds,
            ),
            model_tier: defaults.model_tier,
            response_length: defaults.response_length,
            verify_ssl: env_bool("PMCOPILOT_VERIFY_SSL", defaults.verify_ssl),
        }
    }

    pub fn agent_response_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_response_timeout_seconds)
    }

    pub fn tool_call_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_call_timeout_seconds)
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.max_history_runs, 5);
        assert_eq!(cfg.cache_ttl_seconds, 3600);
        assert_eq!(cfg.agent_response_timeout_seconds, 1800);
    }
}
