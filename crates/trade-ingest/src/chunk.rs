// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Sliding-window chunking over extracted page text.

const CHUNK_SIZE: usize = 1000;
const OVERLAP: usize = 200;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub page: Option<usize>,
}

/// Split `pages` into overlapping chunks of `CHUNK_SIZE` characters with
/// `OVERLAP` characters of carry-over between consecutive windows within a
/// page. Chunks never span a page boundary. Empty chunks are dropped.
pub fn chunk_pages(pages: &[String]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut index = 0usize;

    for (page_no, page) in pages.iter().enumerate() {
        let chars: Vec<char> = page.chars().collect();
        if chars.is_empty() {
            continue;
        }

        let stride = CHUNK_SIZE.saturating_sub(OVERLAP).max(1);
        let mut start = 0usize;
        loop {
            let end = (start + CHUNK_SIZE).min(chars.len());
            let text: String = chars[start..end].iter().collect();
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                chunks.push(Chunk { index, text: trimmed.to_string(), page: Some(page_no) });
                index += 1;
            }
            if end == chars.len() {
                break;
            }
            start += stride;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_page_produces_single_chunk() {
        let pages = vec!["hello world".to_string()];
        let chunks = chunk_pages(&pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].page, Some(0));
    }

    #[test]
    fn long_page_overlaps_windows() {
        let pages = vec!["a".repeat(2500)];
        let chunks = chunk_pages(&pages);
        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn empty_page_is_skipped() {
        let pages = vec!["".to_string(), "content".to_string()];
        let chunks = chunk_pages(&pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, Some(1));
    }

    #[test]
    fn chunks_never_span_pages() {
        let pages = vec!["x".repeat(1200), "y".repeat(1200)];
        let chunks = chunk_pages(&pages);
        assert!(chunks.iter().all(|c| c.text.chars().all(|ch| ch == 'x') || c.text.chars().all(|ch| ch == 'y')));
    }
}
