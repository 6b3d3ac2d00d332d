// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no extractable text in document")]
    NoText,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
