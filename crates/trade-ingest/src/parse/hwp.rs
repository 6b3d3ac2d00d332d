// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HWP v5 text extraction. HWP v5 files are OLE2 compound documents; the
//! document body lives in `BodyText/SectionN` streams, each a sequence of
//! tagged records optionally deflate-compressed (no zlib header) as
//! signalled by the `FileHeader` stream. Paragraph text lives in
//! `HWPTAG_PARA_TEXT` (tag 67) records as UTF-16LE.

use std::io::Read;

use flate2::read::DeflateDecoder;

use super::ExtractedText;

const HWPTAG_PARA_TEXT: u32 = 67;

pub fn extract(bytes: &[u8]) -> anyhow::Result<ExtractedText> {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut cfb = cfb::CompoundFile::open(&mut cursor).map_err(|err| anyhow::anyhow!("not an OLE compound document: {err}"))?;

    let compressed = read_compressed_flag(&mut cfb).unwrap_or(true);

    let mut section_names: Vec<String> = Vec::new();
    for entry in cfb.walk() {
        if entry.is_stream() {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if path.to_string_lossy().contains("BodyText") && name.starts_with("Section") {
                    section_names.push(path.to_string_lossy().into_owned());
                }
            }
        }
    }
    section_names.sort_by_key(|n| section_index(n));

    let mut pages = Vec::new();
    let mut warnings = Vec::new();

    for name in &section_names {
        match read_section(&mut cfb, name, compressed) {
            Ok(text) => pages.push(text),
            Err(err) => warnings.push(format!("section '{name}' not decompressible: {err}")),
        }
    }

    if section_names.is_empty() {
        warnings.push("no BodyText sections found in compound document".to_string());
    }

    Ok(ExtractedText { pages, warnings })
}

fn section_index(name: &str) -> usize {
    name.rsplit("Section").next().and_then(|n| n.parse().ok()).unwrap_or(0)
}

fn read_compressed_flag<F: Read + std::io::Seek>(cfb: &mut cfb::CompoundFile<F>) -> anyhow::Result<bool> {
    let mut header = Vec::new();
    cfb.open_stream("/FileHeader")?.read_to_end(&mut header)?;
    // Byte 36 bit 0 of the 256-byte FileHeader stream is the compressed flag.
    Ok(header.get(36).map(|b| b & 0x01 != 0).unwrap_or(true))
}

fn read_section<F: Read + std::io::Seek>(cfb: &mut cfb::CompoundFile<F>, path: &str, compressed: bool) -> anyhow::Result<String> {
    let mut raw = Vec::new();
    cfb.open_stream(path)?.read_to_end(&mut raw)?;

    let bytes = if compressed {
        let mut decoder = DeflateDecoder::new(&raw[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    Ok(extract_paragraph_text(&bytes))
}

/// Walk the tagged-record stream and collect every `HWPTAG_PARA_TEXT`
/// record's UTF-16LE payload. A record header is a 32-bit little-endian
/// word packing tag(10 bits)/level(10 bits)/size(12 bits); size `0xFFF`
/// means the real size follows as a separate 32-bit word.
fn extract_paragraph_text(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut pos = 0usize;

    while pos + 4 <= bytes.len() {
        let header = u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]);
        pos += 4;

        let tag = header & 0x3FF;
        let mut size = (header >> 20) & 0xFFF;

        if size == 0xFFF {
            if pos + 4 > bytes.len() {
                break;
            }
            size = u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]);
            pos += 4;
        }

        let size = size as usize;
        if pos + size > bytes.len() {
            break;
        }

        if tag == HWPTAG_PARA_TEXT {
            let payload = &bytes[pos..pos + size];
            let units: Vec<u16> = payload.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            let text: String = char::decode_utf16(units)
                .filter_map(|r| r.ok())
                .filter(|c| !c.is_control() || *c == '\n')
                .collect();
            if !text.trim().is_empty() {
                out.push_str(&text);
                out.push('\n');
            }
        }

        pos += size;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ole_bytes_error() {
        assert!(extract(b"not an ole file").is_err());
    }

    #[test]
    fn section_index_parses_trailing_number() {
        assert_eq!(section_index("BodyText/Section0"), 0);
        assert_eq!(section_index("BodyText/Section12"), 12);
    }

    #[test]
    fn extract_paragraph_text_reads_simple_record() {
        let text_utf16: Vec<u8> = "hi".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let size = text_utf16.len() as u32;
        let header = (HWPTAG_PARA_TEXT & 0x3FF) | (size << 20);
        let mut stream = header.to_le_bytes().to_vec();
        stream.extend_from_slice(&text_utf16);

        let text = extract_paragraph_text(&stream);
        assert_eq!(text.trim(), "hi");
    }

    #[test]
    fn extract_paragraph_text_ignores_other_tags() {
        let header = (1u32 & 0x3FF) | (4u32 << 20);
        let mut stream = header.to_le_bytes().to_vec();
        stream.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(extract_paragraph_text(&stream), "");
    }
}
