// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod builtin;
pub mod registry;
pub mod search;
pub mod tool;

pub use registry::{ToolRegistry, ToolSchema};
pub use search::VectorSearch;
pub use tool::{passages_to_content, Passage, Tool, ToolCall, ToolOutput};

pub use builtin::search_trade_documents::SearchTradeDocumentsTool;
pub use builtin::search_user_document::SearchUserDocumentTool;
pub use builtin::search_web::SearchWebTool;
