// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("buyer name normalizes to an empty key")]
    EmptyBuyerNorm,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
