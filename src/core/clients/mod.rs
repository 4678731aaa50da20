//! Concrete LLM provider clients implementing [`crate::core::client_wrapper::ClientWrapper`].
//!
//! [`crate::core::provider_registry::ProviderRegistry`] is the only component
//! that constructs these directly; the rest of the crate talks to providers
//! exclusively through the trait object.

pub mod claude;
pub mod common;
pub mod gemini;
pub mod grok;
pub mod openai;
