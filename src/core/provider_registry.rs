//! Provider credential and client registry.
//!
//! Owns the mapping from [`ModelTier`] to a concrete `(Provider, model)`
//! pair and constructs the matching [`ClientWrapper`] on demand. Credential
//! storage follows a round-robin rotation cursor per provider: an index
//! that advances and wraps across a list of alternate keys.
//!
//! Credentials set explicitly through [`ProviderRegistry::update_keys`] are
//! tracked as user overrides; [`ProviderRegistry::reload_from_environment`]
//! never clobbers them, so an operator-supplied key always outlives a
//! subsequent environment re-read.

use crate::core::client_wrapper::ClientWrapper;
use crate::core::clients::{claude, gemini, grok, openai};
use crate::core::error::CoreError;
use crate::core::types::{ModelTier, Provider};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A provider's primary key plus any alternates available for rotation.
#[derive(Debug, Clone)]
pub struct ProviderCredential {
    pub primary_key: String,
    pub alternate_keys: Vec<String>,
    rotation_cursor: usize,
}

impl ProviderCredential {
    pub fn new(primary_key: String) -> Self {
        ProviderCredential {
            primary_key,
            alternate_keys: Vec::new(),
            rotation_cursor: 0,
        }
    }

    pub fn with_alternates(mut self, alternates: Vec<String>) -> Self {
        self.alternate_keys = alternates;
        self
    }

    /// Round-robin over `[primary_key, ...alternate_keys]`, advancing the cursor each call.
    fn next_key(&mut self) -> String {
        let all_keys_len = 1 + self.alternate_keys.len();
        let index = self.rotation_cursor % all_keys_len;
        self.rotation_cursor = (self.rotation_cursor + 1) % all_keys_len;
        if index == 0 {
            self.primary_key.clone()
        } else {
            self.alternate_keys[index - 1].clone()
        }
    }
}

/// Strategy used by [`ProviderRegistry::get_key`] to pick among rotation candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelection {
    RoundRobin,
    Random,
}

/// Holds configured provider credentials and the tier-to-model mapping,
/// constructing [`ClientWrapper`] trait objects on request.
pub struct ProviderRegistry {
    credentials: Mutex<HashMap<Provider, ProviderCredential>>,
    /// Providers whose credential was set via [`ProviderRegistry::update_keys`]
    /// rather than [`ProviderRegistry::reload_from_environment`] — consulted
    /// so environment reloads never overwrite an explicit override.
    user_overrides: Mutex<HashSet<Provider>>,
    /// Per-tier client overrides. Populated by [`ProviderRegistry::set_tier_override`]
    /// for tests and for self-hosted/compatible deployments that want to bind
    /// a tier to a specific pre-built client rather than the default mapping.
    overrides: Mutex<HashMap<ModelTier, Arc<dyn ClientWrapper>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            credentials: Mutex::new(HashMap::new()),
            user_overrides: Mutex::new(HashSet::new()),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    /// Bind `tier` directly to `client`, bypassing credential lookup and
    /// default-model resolution. Used by test harnesses to substitute a
    /// deterministic double for a real provider client.
    pub fn set_tier_override(&self, tier: ModelTier, client: Arc<dyn ClientWrapper>) {
        self.overrides.lock().unwrap().insert(tier, client);
    }

    /// Populate, replace, or clear credentials for every provider in
    /// `updates`, marking each as a user override so a later
    /// [`ProviderRegistry::reload_from_environment`] leaves it alone. A key
    /// of `""` clears that provider's credential and override status,
    /// letting environment reload take it over again. Returns the providers
    /// actually touched.
    pub fn update_keys(&self, updates: HashMap<Provider, ProviderCredential>) -> Vec<Provider> {
        let mut credentials = self.credentials.lock().unwrap();
        let mut user_overrides = self.user_overrides.lock().unwrap();
        let mut touched = Vec::with_capacity(updates.len());
        for (provider, credential) in updates {
            if credential.primary_key.is_empty() {
                credentials.remove(&provider);
                user_overrides.remove(&provider);
            } else {
                credentials.insert(provider, credential);
                user_overrides.insert(provider);
            }
            touched.push(provider);
        }
        touched
    }

    /// Single-pair convenience wrapper around [`ProviderRegistry::update_keys`].
    pub fn update_key(&self, provider: Provider, credential: ProviderCredential) -> Vec<Provider> {
        let mut updates = HashMap::with_capacity(1);
        updates.insert(provider, credential);
        self.update_keys(updates)
    }

    /// Re-read every provider's standard environment variable
    /// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `XAI_API_KEY`, `GEMINI_API_KEY`),
    /// skipping any provider that already has a user-set credential.
    pub fn reload_from_environment(&self) {
        let mappings: [(Provider, &str); 4] = [
            (Provider::OpenAI, "OPENAI_API_KEY"),
            (Provider::Claude, "ANTHROPIC_API_KEY"),
            (Provider::Grok, "XAI_API_KEY"),
            (Provider::Gemini, "GEMINI_API_KEY"),
        ];
        let user_overrides = self.user_overrides.lock().unwrap();
        let mut credentials = self.credentials.lock().unwrap();
        for (provider, env_var) in mappings {
            if user_overrides.contains(&provider) {
                continue;
            }
            if let Ok(key) = std::env::var(env_var) {
                if !key.is_empty() {
                    credentials.insert(provider, ProviderCredential::new(key));
                }
            }
        }
    }

    /// Which providers currently have at least one key configured.
    pub fn configured_providers(&self) -> Vec<Provider> {
        self.credentials.lock().unwrap().keys().copied().collect()
    }

    /// Select the next credential key for `provider` per `strategy`.
    pub fn get_key(&self, provider: Provider, strategy: KeySelection) -> Result<String, CoreError> {
        let mut credentials = self.credentials.lock().unwrap();
        let credential = credentials
            .get_mut(&provider)
            .ok_or_else(|| CoreError::ProviderNotConfigured(provider.as_str().to_string()))?;
        match strategy {
            KeySelection::RoundRobin => Ok(credential.next_key()),
            KeySelection::Random => {
                let all_keys_len = 1 + credential.alternate_keys.len();
                let pick = pseudo_random_index(all_keys_len);
                if pick == 0 {
                    Ok(credential.primary_key.clone())
                } else {
                    Ok(credential.alternate_keys[pick - 1].clone())
                }
            }
        }
    }

    /// Resolve a [`ModelTier`] to a concrete provider/model and construct the client.
    pub fn get_client(&self, tier: ModelTier) -> Result<Arc<dyn ClientWrapper>, CoreError> {
        if let Some(client) = self.overrides.lock().unwrap().get(&tier) {
            return Ok(Arc::clone(client));
        }
        let (provider, _model_name) = default_model_for_tier(tier);
        let key = self.get_key(provider, KeySelection::RoundRobin)?;
        Ok(build_client(provider, tier, &key))
    }
}

fn default_model_for_tier(tier: ModelTier) -> (Provider, &'static str) {
    match tier {
        ModelTier::Fast => (Provider::OpenAI, "gpt-4.1-nano"),
        ModelTier::Standard => (Provider::OpenAI, "gpt-4o"),
        ModelTier::Premium => (Provider::Claude, "claude-opus-4-1"),
    }
}

fn build_client(provider: Provider, tier: ModelTier, key: &str) -> Arc<dyn ClientWrapper> {
    match provider {
        Provider::OpenAI => {
            let model = match tier {
                ModelTier::Fast => openai::Model::GPT41Nano,
                ModelTier::Standard => openai::Model::GPT4o,
                ModelTier::Premium => openai::Model::GPT5,
            };
            Arc::new(openai::OpenAIClient::new_with_model_enum(key, model))
        }
        Provider::Claude => {
            let model = match tier {
                ModelTier::Fast => claude::Model::ClaudeHaiku35,
                ModelTier::Standard => claude::Model::ClaudeSonnet4,
                ModelTier::Premium => claude::Model::ClaudeOpus41,
            };
            Arc::new(claude::ClaudeClient::new_with_model_enum(key, model))
        }
        Provider::Grok => {
            let model = match tier {
                ModelTier::Fast => grok::Model::Grok3Mini,
                ModelTier::Standard => grok::Model::Grok3,
                ModelTier::Premium => grok::Model::Grok4_0709,
            };
            Arc::new(grok::GrokClient::new_with_model_enum(key, model))
        }
        Provider::Gemini => {
            let model = match tier {
                ModelTier::Fast => gemini::Model::Gemini20FlashLite001,
                ModelTier::Standard => gemini::Model::Gemini20Flash,
                ModelTier::Premium => gemini::Model::Gemini25Pro,
            };
            Arc::new(gemini::GeminiClient::new_with_model_enum(key, model))
        }
    }
}

/// Deterministic-enough index picker without pulling in a `rand`
/// dependency; seeded from the current time so repeated calls within a
/// process still vary.
fn pseudo_random_index(bound: usize) -> usize {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound <= 1 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as usize) % bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_keys() {
        let registry = ProviderRegistry::new();
        registry.update_key(
            Provider::OpenAI,
            ProviderCredential::new("k1".into()).with_alternates(vec!["k2".into(), "k3".into()]),
        );
        let first = registry.get_key(Provider::OpenAI, KeySelection::RoundRobin).unwrap();
        let second = registry.get_key(Provider::OpenAI, KeySelection::RoundRobin).unwrap();
        let third = registry.get_key(Provider::OpenAI, KeySelection::RoundRobin).unwrap();
        let fourth = registry.get_key(Provider::OpenAI, KeySelection::RoundRobin).unwrap();
        assert_eq!(first, "k1");
        assert_eq!(second, "k2");
        assert_eq!(third, "k3");
        assert_eq!(fourth, "k1");
    }

    #[test]
    fn unconfigured_provider_is_an_error() {
        let registry = ProviderRegistry::new();
        let err = registry.get_key(Provider::Gemini, KeySelection::RoundRobin).unwrap_err();
        assert!(matches!(err, CoreError::ProviderNotConfigured(_)));
    }

    #[test]
    fn configured_providers_reflects_updates() {
        let registry = ProviderRegistry::new();
        registry.update_key(Provider::Claude, ProviderCredential::new("k".into()));
        assert_eq!(registry.configured_providers(), vec![Provider::Claude]);
    }

    #[test]
    fn reload_from_environment_preserves_user_override() {
        let registry = ProviderRegistry::new();
        registry.update_key(Provider::OpenAI, ProviderCredential::new("user-supplied".into()));
        std::env::set_var("OPENAI_API_KEY", "from-environment");
        registry.reload_from_environment();
        std::env::remove_var("OPENAI_API_KEY");
        let key = registry.get_key(Provider::OpenAI, KeySelection::RoundRobin).unwrap();
        assert_eq!(key, "user-supplied");
    }

    #[test]
    fn empty_key_clears_override() {
        let registry = ProviderRegistry::new();
        registry.update_key(Provider::Gemini, ProviderCredential::new("k".into()));
        assert_eq!(registry.configured_providers(), vec![Provider::Gemini]);
        registry.update_key(Provider::Gemini, ProviderCredential::new(String::new()));
        assert!(registry.configured_providers().is_empty());
    }

    #[test]
    fn update_keys_reports_every_touched_provider() {
        let registry = ProviderRegistry::new();
        let mut updates = HashMap::new();
        updates.insert(Provider::OpenAI, ProviderCredential::new("k1".into()));
        updates.insert(Provider::Claude, ProviderCredential::new("k2".into()));
        let mut touched = registry.update_keys(updates);
        touched.sort();
        assert_eq!(touched, vec![Provider::Claude, Provider::OpenAI]);
    }
}
