// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Prompt Registry Adapter (C1): fetch & cache templates by name+version/label,
//! falling back to bundled files on remote failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::bundled;
use crate::client::{HttpRemoteClient, RemoteTemplateClient};
use crate::error::PromptError;
use crate::template::{self, Template};

pub struct PromptRegistry {
    remote: Option<Arc<dyn RemoteTemplateClient>>,
    cache: Mutex<HashMap<String, Template>>,
}

impl PromptRegistry {
    pub fn new(remote: Option<Arc<dyn RemoteTemplateClient>>) -> Self {
        Self { remote, cache: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(cfg: &trade_config::PromptRegistryConfig) -> Self {
        let remote = HttpRemoteClient::from_config(cfg).map(|c| Arc::new(c) as Arc<dyn RemoteTemplateClient>);
        Self::new(remote)
    }

    fn cache_key(name: &str, version: Option<&str>, label: &str) -> String {
        format!("{name}::{}", version.unwrap_or(label))
    }

    /// Fetch a template, checking the process-lifetime cache first. On a
    /// cache miss, tries the remote registry (if configured); only a
    /// successful remote fetch is cached, so a bundled fallback keeps
    /// retrying the remote on every subsequent call.
    pub async fn get_template(&self, name: &str, version: Option<&str>, label: &str) -> Result<Template, PromptError> {
        let key = Self::cache_key(name, version, label);
        if let Some(cached) = self.cache.lock().expect("prompt cache lock poisoned").get(&key).cloned() {
            return Ok(cached);
        }

        if let Some(remote) = &self.remote {
            match remote.fetch(name, version, label).await {
                Ok(template) => {
                    self.cache.lock().expect("prompt cache lock poisoned").insert(key, template.clone());
                    return Ok(template);
                }
                Err(err) => {
                    tracing::warn!(template = name, error = %err, "prompt registry fetch failed, falling back to bundled template");
                }
            }
        }

        bundled::load(name, label).ok_or_else(|| PromptError::NoBundledFallback(name.to_string()))
    }

    pub fn compile(&self, template: &Template, vars: &HashMap<String, String>) -> Result<String, PromptError> {
        template::compile(template, vars)
    }

    pub fn clear_cache(&self) {
        self.cache.lock().expect("prompt cache lock poisoned").clear();
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
