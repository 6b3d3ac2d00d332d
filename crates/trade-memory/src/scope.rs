// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Scope-key formatting for the four memory types.
//!
//! Every memory item is isolated by a `scope_key` string derived from the
//! ids named in its table row (see the memory service). Buyer memos
//! additionally normalize the counterparty name so that casing and
//! whitespace differences don't fragment one buyer's memory across keys.

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    DocSession,
    GenChatSession,
    UserPreference,
    BuyerMemo,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocSession => "doc_session",
            Self::GenChatSession => "gen_chat_session",
            Self::UserPreference => "user_preference",
            Self::BuyerMemo => "buyer_memo",
        }
    }

    /// The summarization prompt used to compress a raw message list into
    /// the durable content stored for this scope.
    pub fn summarization_prompt(&self) -> &'static str {
        match self {
            Self::DocSession => {
                "Summarize current document-work session: goals, edits, completions; \
                 exclude greetings & numeric line-items."
            }
            Self::GenChatSession => {
                "Summarize current chat: topic, Q/A digest; exclude greetings & repetition."
            }
            Self::UserPreference => {
                "Extract durable preferences: Incoterms, payment terms, style, recurring \
                 goods/regions; exclude one-off specifics."
            }
            Self::BuyerMemo => {
                "Extract durable notes about the counterparty: preferences, cautions, \
                 comms style; exclude single transactions."
            }
        }
    }
}

pub fn doc_scope(doc_id: &str) -> String {
    format!("doc_{doc_id}")
}

pub fn gen_chat_scope(gen_chat_id: &str) -> String {
    format!("gen_chat_{gen_chat_id}")
}

pub fn user_scope(user_id: &str) -> String {
    format!("user_{user_id}")
}

pub fn buyer_scope(user_id: &str, buyer_name: &str) -> Result<String, MemoryError> {
    let norm = normalize_buyer(buyer_name)?;
    Ok(format!("buyer_{user_id}_{norm}"))
}

/// Normalize a counterparty name into a stable scope-key fragment: lowercase,
/// everything that isn't `[a-z0-9_]` or CJK is stripped, and a run of
/// whitespace becomes a single `_` — unless that whitespace directly follows
/// stripped punctuation, in which case it is absorbed along with it rather
/// than becoming its own separator (so `"Co., Ltd."` collapses to `coltd`,
/// not `co_ltd`). An all-stripped (empty) result is rejected.
pub fn normalize_buyer(name: &str) -> Result<String, MemoryError> {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    let mut absorb_whitespace = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            if !absorb_whitespace {
                pending_sep = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '_' || is_cjk(c) {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            absorb_whitespace = false;
            out.push(c);
        } else {
            // punctuation: stripped, and it swallows a directly following
            // run of whitespace rather than leaving a separator behind.
            pending_sep = false;
            absorb_whitespace = true;
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        return Err(MemoryError::EmptyBuyerNorm);
    }
    Ok(out)
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF // CJK unified ideographs
        | 0x3040..=0x309F // Hiragana
        | 0x30A0..=0x30FF // Katakana
        | 0xAC00..=0xD7A3 // Hangul syllables
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_scope_formats_with_prefix() {
        assert_eq!(doc_scope("d1"), "doc_d1");
    }

    #[test]
    fn gen_chat_scope_formats_with_prefix() {
        assert_eq!(gen_chat_scope("c1"), "gen_chat_c1");
    }

    #[test]
    fn user_scope_formats_with_prefix() {
        assert_eq!(user_scope("u1"), "user_u1");
    }

    #[test]
    fn buyer_scope_normalizes_and_formats() {
        let scope = buyer_scope("u1", "  Acme  Trading Co.  ").unwrap();
        assert_eq!(scope, "buyer_u1_acme_trading_co");
    }

    #[test]
    fn buyer_scope_rejects_empty_norm() {
        let err = buyer_scope("u1", "  !!!  ").unwrap_err();
        assert!(matches!(err, MemoryError::EmptyBuyerNorm));
    }

    #[test]
    fn normalize_buyer_preserves_cjk() {
        let norm = normalize_buyer("상사 무역").unwrap();
        assert_eq!(norm, "상사_무역");
    }

    #[test]
    fn normalize_buyer_strips_punctuation() {
        let norm = normalize_buyer("A&B, Corp!").unwrap();
        assert_eq!(norm, "abcorp");
    }

    #[test]
    fn normalize_buyer_absorbs_whitespace_after_punctuation_run() {
        let norm = normalize_buyer("ACME Co., Ltd.").unwrap();
        assert_eq!(norm, "acme_coltd");
    }

    #[test]
    fn memory_type_as_str_matches_table() {
        assert_eq!(MemoryType::DocSession.as_str(), "doc_session");
        assert_eq!(MemoryType::GenChatSession.as_str(), "gen_chat_session");
        assert_eq!(MemoryType::UserPreference.as_str(), "user_preference");
        assert_eq!(MemoryType::BuyerMemo.as_str(), "buyer_memo");
    }
}
