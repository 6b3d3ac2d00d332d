// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Best-effort buyer-name extraction from a document's HTML, used to scope
//! the counterparty-memo write in `save_smart`.

use regex::Regex;
use std::sync::OnceLock;

fn label_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:To|Buyer|Messrs\.?)\s*[:：]\s*([^<\n]{1,200})").unwrap())
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Scans `html` for a `To:`/`Buyer:`/`Messrs.` label and returns the
/// captured name when its stripped length falls in `(2, 100)` characters.
pub fn extract_buyer_name(html: &str) -> Option<String> {
    let captures = label_pattern().captures(html)?;
    let raw = captures.get(1)?.as_str();
    let stripped = tag_pattern().replace_all(raw, "").trim().to_string();
    if stripped.len() > 2 && stripped.len() < 100 {
        Some(stripped)
    } else {
        None
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
