// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("unknown template variable(s) referenced in '{template}': {missing:?}")]
    ConfigError { template: String, missing: Vec<String> },
    #[error("no bundled fallback for template '{0}'")]
    NoBundledFallback(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
