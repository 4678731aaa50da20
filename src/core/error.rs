//! Crate-wide error enum for the orchestration core.
//!
//! A plain enum, a manual [`std::fmt::Display`] impl, and an `impl Error`
//! marker — no `thiserror`. Call sites box it as `Box<dyn Error + Send +
//! Sync>` the same way the rest of the crate boxes provider errors.

use crate::core::types::AgentRole;
use std::error::Error;
use std::fmt;

/// Failure modes a [`crate::core::coordinator::Coordinator`] run can surface.
#[derive(Debug, Clone)]
pub enum CoreError {
    /// No credential is configured for the requested provider.
    ProviderNotConfigured(String),
    /// The configured credential was rejected by the provider.
    ProviderAuthFailed(String),
    /// The provider was reachable but returned a transport/server error.
    ProviderUnavailable(String),
    /// An agent invocation exceeded its configured timeout.
    AgentTimeout { agent: AgentRole, timeout_seconds: u64 },
    /// The knowledge store could not be queried; treated as a skip, not a hard failure.
    KnowledgeUnavailable(String),
    /// The response cache backend could not be reached; treated as a pass-through.
    CacheUnavailable(String),
    /// A supporting or primary agent failed but the run produced a degraded response.
    PartialSynthesis { agent: AgentRole, cause: String },
    /// The client cancelled the request before completion.
    CancelledByClient,
    /// The request failed validation before any agent was invoked.
    InvalidRequest(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ProviderNotConfigured(provider) => {
                write!(f, "no credential configured for provider '{}'", provider)
            }
            CoreError::ProviderAuthFailed(provider) => {
                write!(f, "authentication failed for provider '{}'", provider)
            }
            CoreError::ProviderUnavailable(detail) => {
                write!(f, "provider unavailable: {}", detail)
            }
            CoreError::AgentTimeout { agent, timeout_seconds } => write!(
                f,
                "agent '{}' timed out after {}s",
                agent, timeout_seconds
            ),
            CoreError::KnowledgeUnavailable(detail) => {
                write!(f, "knowledge store unavailable: {}", detail)
            }
            CoreError::CacheUnavailable(detail) => {
                write!(f, "response cache unavailable: {}", detail)
            }
            CoreError::PartialSynthesis { agent, cause } => write!(
                f,
                "partial synthesis: agent '{}' failed ({})",
                agent, cause
            ),
            CoreError::CancelledByClient => write!(f, "request cancelled by client"),
            CoreError::InvalidRequest(detail) => write!(f, "invalid request: {}", detail),
        }
    }
}

impl Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_agent_name() {
        let err = CoreError::AgentTimeout {
            agent: AgentRole::Research,
            timeout_seconds: 30,
        };
        assert!(err.to_string().contains("research"));
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn boxes_as_send_sync_error() {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(CoreError::CancelledByClient);
        assert_eq!(boxed.to_string(), "request cancelled by client");
    }
}
