//! PDF metadata management.
//!
//! Reads and writes the document Info dictionary: Title, Author, Subject and
//! Keywords from [`Metadata`], plus Producer and modification date.

use crate::config::Metadata;
use crate::error::{DocError, Result};
use lopdf::{Dictionary, Document, Object};
use std::time::{SystemTime, UNIX_EPOCH};

/// Manager for PDF metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Set metadata on a document.
    ///
    /// Only non-empty fields are written; an empty [`Metadata`] leaves the
    /// document untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailer points at an Info object that is not
    /// a dictionary and cannot be replaced.
    pub fn set_metadata(&self, doc: &mut Document, metadata: &Metadata) -> Result<()> {
        if metadata.is_empty() {
            return Ok(());
        }

        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        if !matches!(doc.get_object(info_id), Ok(Object::Dictionary(_))) {
            doc.objects.insert(info_id, Object::Dictionary(Dictionary::new()));
        }

        let Ok(Object::Dictionary(info)) = doc.get_object_mut(info_id) else {
            return Err(DocError::MetadataFailed {
                reason: "Failed to create Info dictionary".to_string(),
            });
        };

        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info.set(key, text_string(value));
            }
        }

        info.set("Producer", Object::string_literal(crate::NAME));
        info.set(
            "ModDate",
            Object::string_literal(format_pdf_date(SystemTime::now())),
        );

        Ok(())
    }

    /// Read metadata from a document's Info dictionary.
    pub fn get_metadata(&self, doc: &Document) -> Metadata {
        let info = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id));

        let Ok(info) = info else {
            return Metadata::default();
        };

        Metadata::new(
            string_field(info, b"Title"),
            string_field(info, b"Author"),
            string_field(info, b"Subject"),
            string_field(info, b"Keywords"),
        )
    }
}

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

/// Encode a PDF text string: plain bytes for ASCII, UTF-16BE with a byte
/// order mark otherwise.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = UTF16_BOM.to_vec();
    bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
    Object::string_literal(bytes)
}

fn decode_text_string(bytes: &[u8]) -> Option<String> {
    match bytes.strip_prefix(&UTF16_BOM) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        // PDFDocEncoding matches Latin-1 for printable text
        None => Some(bytes.iter().copied().map(char::from).collect()),
    }
}

fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => None,
    }
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`, UTC).
fn format_pdf_date(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        year,
        month,
        day,
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

/// Convert days since 1970-01-01 into a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
