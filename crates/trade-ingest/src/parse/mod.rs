// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Format-specific text extraction, dispatched by filename extension.

mod docx;
mod hwp;
mod pdf;

#[derive(Debug, Default)]
pub struct ExtractedText {
    /// One entry per detected page (PDF) or section (HWP); a single entry
    /// holding the whole body for formats without a page concept (DOCX).
    pub pages: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExtractedText {
    pub fn full_text(&self) -> String {
        self.pages.join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// Average non-whitespace characters per page — used to flag scanned
    /// PDFs that likely need OCR.
    pub fn avg_chars_per_page(&self) -> f64 {
        if self.pages.is_empty() {
            return 0.0;
        }
        let total: usize = self.pages.iter().map(|p| p.trim().chars().count()).sum();
        total as f64 / self.pages.len() as f64
    }
}

pub fn extract(filename: &str, bytes: &[u8]) -> anyhow::Result<ExtractedText> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => pdf::extract(bytes),
        "docx" => docx::extract(bytes),
        "hwp" => hwp::extract(bytes),
        other => anyhow::bail!("unsupported document extension '{other}'"),
    }
}
