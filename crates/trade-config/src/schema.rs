// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub prompt_registry: PromptRegistryConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub collections: CollectionsConfig,
    /// Named provider configurations.
    ///
    /// Define additional model endpoints here and reference them by name
    /// from agent configuration.
    ///
    /// ```yaml
    /// providers:
    ///   local_ollama:
    ///     provider: compat
    ///     base_url: http://localhost:11434/v1
    ///     name: llama3.2
    /// ```
    #[serde(default)]
    pub providers: std::collections::HashMap<String, ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier. See `trade_model::registry` for the full list.
    /// Common values: "compat" (any OpenAI-compatible chat-completions
    /// server) | "mock" (deterministic, no network).
    pub provider: String,
    /// Model name forwarded to the provider API.
    pub name: String,
    /// Environment variable that holds the API key (read at runtime).
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files.
    pub api_key: Option<String>,
    /// Base URL of the chat-completions endpoint. Required for the "compat"
    /// provider; ignored by "mock".
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4o".into(),
            // api_key_env is intentionally None here. resolve_api_key() falls
            // through to the driver registry, which already knows the
            // canonical env-var name for each provider. Hard-coding it here
            // would shadow the registry lookup.
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model id forwarded to the embedding endpoint, e.g.
    /// "text-embedding-3-small".
    pub model: String,
    /// Environment variable that holds the embedding API key. Defaults to
    /// the same key used for chat completions when unset.
    pub api_key_env: Option<String>,
    /// Base URL of the embeddings endpoint. Defaults to `model.base_url`
    /// when unset, since most OpenAI-compatible gateways serve both from
    /// the same host.
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".into(),
            api_key_env: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP surface binds to.
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// Port the HTTP surface binds to.
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".into()
    }
    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Path to the local hybrid vector/BM25 database file.
    /// Relative paths are resolved against the working directory.
    pub path: Option<String>,
    /// Remote vector-store URL, when the store is a network service rather
    /// than an embedded file. Mutually exclusive with `path` in practice,
    /// but both may be set; callers prefer `url` when present.
    pub url: Option<String>,
    /// Environment variable that holds the remote vector-store API key.
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRegistryConfig {
    /// Base URL of the remote prompt registry. When unset, only the
    /// bundled fallback templates are used.
    pub base_url: Option<String>,
    /// Environment variable holding the registry's public key.
    pub public_key_env: Option<String>,
    /// Environment variable holding the registry's secret key.
    pub secret_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Bucket holding source trade documents.
    pub bucket: Option<String>,
    /// Region, when the backend requires one.
    pub region: Option<String>,
    /// Endpoint override for S3-compatible stores that are not AWS itself.
    pub endpoint: Option<String>,
    /// Environment variable holding the access key id.
    pub access_key_env: Option<String>,
    /// Environment variable holding the secret access key.
    pub secret_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Brave Search API key override (also checked via the BRAVE_API_KEY
    /// environment variable at call time). Unset disables `search_web`.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Vector-store collection used for the shared trade knowledge base.
    #[serde(default = "CollectionsConfig::default_knowledge")]
    pub knowledge: String,
    /// Vector-store collection used for per-user uploaded documents.
    #[serde(default = "CollectionsConfig::default_user_documents")]
    pub user_documents: String,
}

impl CollectionsConfig {
    fn default_knowledge() -> String {
        "trade_knowledge".into()
    }
    fn default_user_documents() -> String {
        "user_documents".into()
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            knowledge: Self::default_knowledge(),
            user_documents: Self::default_user_documents(),
        }
    }
}


// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────────────────

    #[test]
    fn config_default_model_provider_is_openai() {
        let c = Config::default();
        assert_eq!(c.model.provider, "openai");
    }

    #[test]
    fn config_default_model_name_is_gpt4o() {
        let c = Config::default();
        assert_eq!(c.model.name, "gpt-4o");
    }

    #[test]
    fn config_default_api_key_env_is_none() {
        // api_key_env must be None in the default config so that resolve_api_key()
        // falls through to the driver registry.
        let c = Config::default();
        assert!(c.model.api_key_env.is_none());
    }

    #[test]
    fn config_default_no_explicit_api_key() {
        let c = Config::default();
        assert!(c.model.api_key.is_none());
    }

    #[test]
    fn config_default_max_tokens_is_some() {
        let c = Config::default();
        assert_eq!(c.model.max_tokens, Some(4096));
    }

    #[test]
    fn config_default_server_host_and_port() {
        let c = Config::default();
        assert_eq!(c.server.host, "0.0.0.0");
        assert_eq!(c.server.port, 8080);
    }

    #[test]
    fn config_default_embedding_model() {
        let c = Config::default();
        assert_eq!(c.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn config_default_collections() {
        let c = Config::default();
        assert_eq!(c.collections.knowledge, "trade_knowledge");
        assert_eq!(c.collections.user_documents, "user_documents");
    }

    #[test]
    fn config_default_vector_store_unset() {
        let c = Config::default();
        assert!(c.vector_store.path.is_none());
        assert!(c.vector_store.url.is_none());
    }

    #[test]
    fn config_default_prompt_registry_unset() {
        let c = Config::default();
        assert!(c.prompt_registry.base_url.is_none());
    }

    #[test]
    fn config_default_object_store_unset() {
        let c = Config::default();
        assert!(c.object_store.bucket.is_none());
    }

    #[test]
    fn config_default_web_search_unset() {
        let c = Config::default();
        assert!(c.web_search.api_key.is_none());
    }

    // ── YAML round-trip ───────────────────────────────────────────────────────

    #[test]
    fn config_serialises_to_valid_yaml() {
        let c = Config::default();
        let yaml_str = serde_yaml::to_string(&c).unwrap();
        assert!(yaml_str.contains("provider"));
        assert!(yaml_str.contains("openai"));
    }

    #[test]
    fn config_deserialises_from_yaml() {
        let yaml_str =
            "model:\n  provider: compat\n  name: llama3.2\n  max_tokens: 8192\n  base_url: http://localhost:11434/v1\n";
        let c: Config = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(c.model.provider, "compat");
        assert_eq!(c.model.name, "llama3.2");
        assert_eq!(c.model.max_tokens, Some(8192));
    }

    #[test]
    fn config_partial_yaml_fills_in_defaults() {
        let yaml_str = "model:\n  name: gpt-4o-mini\n  provider: openai\n";
        let c: Config = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(c.model.name, "gpt-4o-mini");
        assert_eq!(c.server.port, ServerConfig::default().port);
    }

    #[test]
    fn config_vector_store_deserialised_from_yaml() {
        let yaml_str = "vector_store:\n  path: /var/lib/trade/vector.db\n";
        let c: Config = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(c.vector_store.path.as_deref(), Some("/var/lib/trade/vector.db"));
    }

    #[test]
    fn config_collections_override_via_yaml() {
        let yaml_str = "collections:\n  knowledge: custom_knowledge\n";
        let c: Config = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(c.collections.knowledge, "custom_knowledge");
        assert_eq!(c.collections.user_documents, "user_documents");
    }

    // ── providers map ─────────────────────────────────────────────────────────

    #[test]
    fn config_default_providers_is_empty() {
        let c = Config::default();
        assert!(c.providers.is_empty(), "providers must be empty by default");
    }

    #[test]
    fn config_providers_deserialised_from_yaml() {
        let yaml = r#"
providers:
  local_ollama:
    provider: compat
    base_url: http://localhost:11434/v1
    name: llama3.2
"#;
        let c: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.providers.len(), 1);
        let p = c.providers.get("local_ollama").unwrap();
        assert_eq!(p.provider, "compat");
        assert_eq!(p.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(p.name, "llama3.2");
    }

    #[test]
    fn config_providers_round_trip_yaml() {
        let yaml = r#"
providers:
  local:
    provider: compat
    base_url: http://127.0.0.1:8080/v1
    name: phi-3
"#;
        let c: Config = serde_yaml::from_str(yaml).unwrap();
        let serialised = serde_yaml::to_string(&c).unwrap();
        let back: Config = serde_yaml::from_str(&serialised).unwrap();
        let p = back.providers.get("local").unwrap();
        assert_eq!(p.name, "phi-3");
        assert_eq!(p.base_url.as_deref(), Some("http://127.0.0.1:8080/v1"));
    }

    #[test]
    fn config_providers_absent_in_yaml_uses_empty_default() {
        let yaml = "model:\n  provider: openai\n  name: gpt-4o\n";
        let c: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(c.providers.is_empty());
    }
}
