// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Dependency container, assembled once at process start. Optional services
//! degrade gracefully — their absence is checked at call sites, never
//! assumed fatal except for the model provider itself.

use std::sync::Arc;

use trade_core::AgentFactory;
use trade_ingest::IngestService;
use trade_memory::MemoryService;

use crate::store::RelationalStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<trade_config::Config>,
    pub agent_factory: Arc<AgentFactory>,
    pub model: Arc<dyn trade_model::ModelProvider>,
    pub memory: Arc<MemoryService>,
    pub relational: Arc<dyn RelationalStore>,
    pub ingest: Option<Arc<IngestService>>,
}
