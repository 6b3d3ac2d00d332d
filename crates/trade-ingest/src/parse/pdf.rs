// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! PDF text extraction. `pdf-extract` separates pages with a form-feed
//! character in its output, which we split on to recover per-page text.

use super::ExtractedText;

pub fn extract(bytes: &[u8]) -> anyhow::Result<ExtractedText> {
    let mut warnings = Vec::new();

    let text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(err) => {
            warnings.push(format!("pdf text extraction failed: {err}"));
            String::new()
        }
    };

    let pages: Vec<String> = if text.is_empty() {
        Vec::new()
    } else {
        text.split('\u{c}').map(|p| p.to_string()).collect()
    };

    Ok(ExtractedText { pages, warnings })
}
