//! PDF text strings.
//!
//! Annotation text (`Contents`, `T`, `Subj`, `NM`) is stored either in
//! PDFDocEncoding or as UTF-16BE with a byte order mark.

use lopdf::{Object, StringFormat};

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

/// PDFDocEncoding code points for 0x80..=0x9F, where it departs from Latin-1.
/// 0x9F is undefined.
const PDF_DOC_HIGH: [char; 32] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
];

/// Spacing diacritics at 0x18..=0x1F.
const PDF_DOC_ACCENTS: [char; 8] = [
    '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
];

/// Decode a string object. Non-string objects yield `None`.
pub fn decode_text_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_bytes(bytes)),
        _ => None,
    }
}

pub fn decode_text_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF16_BOM) {
        let units: Vec<u16> =
            rest.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

fn pdf_doc_char(byte: u8) -> char {
    match byte {
        0x18..=0x1F => PDF_DOC_ACCENTS[usize::from(byte - 0x18)],
        0x80..=0x9F => PDF_DOC_HIGH[usize::from(byte - 0x80)],
        0xA0 => '\u{20AC}',
        0x7F | 0xAD => '\u{FFFD}',
        other => char::from(other),
    }
}

/// Encode text as a literal string: plain bytes when ASCII, UTF-16BE otherwise.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = UTF16_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Literal)
}
