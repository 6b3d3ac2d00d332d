// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Fallback templates shipped with the binary, used when the remote prompt
//! registry is unreachable or returns no body for the requested name.

use crate::template::Template;

const TRADE_ASSISTANT_V1: &str = include_str!("../templates/trade_assistant_v1.txt");
const WRITING_ASSISTANT_V1: &str = include_str!("../templates/writing_assistant_v1.txt");
const DOCUMENT_ASSISTANT_V1: &str = include_str!("../templates/document_assistant_v1.txt");

/// Look up a bundled template body by stable file name. Returns `None` for
/// any name without a bundled fallback.
pub fn lookup(name: &str) -> Option<&'static str> {
    match name {
        "trade_assistant_v1" => Some(TRADE_ASSISTANT_V1),
        "writing_assistant_v1" => Some(WRITING_ASSISTANT_V1),
        "document_assistant_v1" => Some(DOCUMENT_ASSISTANT_V1),
        _ => None,
    }
}

/// Build a `Template` from a bundled body. Bundled loads are never cached by
/// the registry, so a later remote recovery is picked up on the next call.
pub fn load(name: &str, label: &str) -> Option<Template> {
    lookup(name).map(|body| Template { name: name.to_string(), version: None, label: label.to_string(), body: body.to_string() })
}
