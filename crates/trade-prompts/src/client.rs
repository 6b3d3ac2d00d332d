// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP client for the remote prompt registry.

use async_trait::async_trait;
use serde::Deserialize;

use trade_config::PromptRegistryConfig;

use crate::template::Template;

#[async_trait]
pub trait RemoteTemplateClient: Send + Sync {
    async fn fetch(&self, name: &str, version: Option<&str>, label: &str) -> anyhow::Result<Template>;
}

#[derive(Debug, Deserialize)]
struct RemoteTemplateBody {
    body: String,
    version: Option<String>,
}

pub struct HttpRemoteClient {
    base_url: String,
    public_key: Option<String>,
    secret_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteClient {
    pub fn from_config(cfg: &PromptRegistryConfig) -> Option<Self> {
        let base_url = cfg.base_url.clone()?;
        let public_key = cfg.public_key_env.as_deref().and_then(|var| std::env::var(var).ok());
        let secret_key = cfg.secret_key_env.as_deref().and_then(|var| std::env::var(var).ok());
        Some(Self { base_url, public_key, secret_key, client: reqwest::Client::new() })
    }
}

#[async_trait]
impl RemoteTemplateClient for HttpRemoteClient {
    async fn fetch(&self, name: &str, version: Option<&str>, label: &str) -> anyhow::Result<Template> {
        let url = format!("{}/templates/{name}", self.base_url.trim_end_matches('/'));
        let mut req = self.client.get(&url).query(&[("label", label)]);
        if let Some(version) = version {
            req = req.query(&[("version", version)]);
        }
        if let Some(public_key) = &self.public_key {
            req = req.header("X-Public-Key", public_key);
        }
        if let Some(secret_key) = &self.secret_key {
            req = req.header("X-Secret-Key", secret_key);
        }

        let resp = req.send().await?.error_for_status()?;
        let body: RemoteTemplateBody = resp.json().await?;
        Ok(Template { name: name.to_string(), version: body.version, label: label.to_string(), body: body.body })
    }
}
