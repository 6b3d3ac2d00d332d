// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Minimal object-store access: fetch raw document bytes by key.

use async_trait::async_trait;

use trade_config::ObjectStoreConfig;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}

/// S3-compatible object store accessed over plain HTTPS. `object_key` is
/// joined onto the configured endpoint/bucket; callers on a real deployment
/// are expected to supply either a presigned URL as the key or an endpoint
/// that serves unsigned GETs (e.g. a private VPC-internal MinIO).
pub struct HttpObjectStore {
    endpoint: String,
    bucket: Option<String>,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn from_config(cfg: &ObjectStoreConfig) -> Option<Self> {
        let endpoint = cfg.endpoint.clone()?;
        Some(Self { endpoint, bucket: cfg.bucket.clone(), client: reqwest::Client::new() })
    }

    fn url_for(&self, key: &str) -> String {
        if key.starts_with("http://") || key.starts_with("https://") {
            return key.to_string();
        }
        let endpoint = self.endpoint.trim_end_matches('/');
        match &self.bucket {
            Some(bucket) => format!("{endpoint}/{bucket}/{}", key.trim_start_matches('/')),
            None => format!("{endpoint}/{}", key.trim_start_matches('/')),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let url = self.url_for(key);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}
