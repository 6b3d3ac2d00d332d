// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod catalog;
pub mod registry;
pub mod sanitize;
mod http;
mod mock;
mod provider;
mod types;

pub use catalog::{InputModality, ModelCatalogEntry};
pub use http::HttpChatProvider;
pub use mock::{MockProvider, ScriptedMockProvider};
pub use provider::{ModelProvider, ResponseStream};
pub use registry::{get_driver, DriverMeta};
pub use types::*;

use anyhow::bail;
use trade_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] from configuration.
///
/// Selects the driver implementation based on `cfg.provider`. When
/// `max_tokens` is not set in config, the model's `max_output_tokens` is
/// resolved from the static catalog; if the model is not found there a safe
/// default of 4096 is used.
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    let resolved_max_tokens = cfg
        .max_tokens
        .or_else(|| catalog::lookup(&cfg.provider, &cfg.name).map(|e| e.max_output_tokens))
        .unwrap_or(4096);

    match cfg.provider.as_str() {
        "compat" => {
            let base_url = cfg
                .base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("model.base_url is required for the compat provider"))?;
            let provider = HttpChatProvider::new(cfg.name.clone(), resolve_api_key(cfg), base_url)
                .with_max_tokens(resolved_max_tokens)
                .with_temperature(cfg.temperature.unwrap_or(0.2));
            Ok(Box::new(provider))
        }
        "mock" => Ok(Box::new(MockProvider)),
        other => {
            let known: Vec<&str> = registry::known_driver_ids().collect();
            bail!(
                "unknown model provider: {other:?}. known providers: {known}",
                known = known.join(", ")
            )
        }
    }
}

fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    if let Some(meta) = registry::get_driver(&cfg.provider) {
        if let Some(env_var) = meta.default_api_key_env {
            return std::env::var(env_var).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(provider: &str, name: &str) -> ModelConfig {
        ModelConfig { provider: provider.into(), name: name.into(), ..ModelConfig::default() }
    }

    #[test]
    fn from_config_mock_succeeds() {
        let cfg = minimal_config("mock", "mock-model");
        assert!(from_config(&cfg).is_ok());
    }

    #[test]
    fn from_config_compat_requires_base_url() {
        let cfg = minimal_config("compat", "chat-default");
        let err = from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn from_config_compat_succeeds_with_base_url() {
        let mut cfg = minimal_config("compat", "chat-default");
        cfg.base_url = Some("http://localhost:8080/v1".into());
        assert!(from_config(&cfg).is_ok());
    }

    #[test]
    fn from_config_unknown_provider_returns_error() {
        let cfg = minimal_config("totally_unknown_provider_xyz", "some-model");
        let result = from_config(&cfg);
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("unknown model provider"));
    }

    #[test]
    fn resolve_api_key_prefers_explicit_key() {
        let cfg = ModelConfig {
            api_key: Some("explicit-key".into()),
            api_key_env: Some("NONEXISTENT_ENV_VAR_XYZ".into()),
            ..ModelConfig::default()
        };
        assert_eq!(resolve_api_key(&cfg).as_deref(), Some("explicit-key"));
    }
}
