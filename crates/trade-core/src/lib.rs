// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod agent_config;
mod runner;

pub use agent_config::{AgentConfig, AgentFactory};
pub use runner::{run_streamed, EventStream, RunnerEvent, RunnerInput};
