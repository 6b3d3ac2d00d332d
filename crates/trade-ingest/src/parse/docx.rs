// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! DOCX text extraction: join every paragraph's run text with newlines.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use super::ExtractedText;

pub fn extract(bytes: &[u8]) -> anyhow::Result<ExtractedText> {
    let docx = docx_rs::read_docx(bytes).map_err(|err| anyhow::anyhow!("docx parse failed: {err}"))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for pchild in &paragraph.children {
                if let ParagraphChild::Run(run) = pchild {
                    for rchild in &run.children {
                        if let RunChild::Text(text) = rchild {
                            line.push_str(&text.text);
                        }
                    }
                }
            }
            if !line.trim().is_empty() {
                paragraphs.push(line);
            }
        }
    }

    Ok(ExtractedText { pages: vec![paragraphs.join("\n")], warnings: Vec::new() })
}
