//! Content-based MIME classification.
//!
//! Client-supplied MIME types lie: browsers send `application/octet-stream`
//! for anything unusual and users rename files freely. The classifier
//! therefore trusts only the bytes, matching well-known magic numbers and
//! falling back to a text-vs-binary heuristic.
//!
//! ZIP containers need a second look. DOCX, XLSX, and EPUB are all ZIP
//! archives; they are told apart by the archive's member names (`word/`,
//! `xl/`, or an EPUB `mimetype` member), the same markers the formats'
//! own specifications mandate.

use std::io::Cursor;

use tracing::debug;

use crate::format::FormatDescriptor;

/// How many leading bytes the classifier inspects for magic numbers and
/// the text heuristic.
const SNIFF_LEN: usize = 512;

/// Classify a payload by content and return its descriptor.
///
/// Never fails: bytes that match nothing are reported as
/// `application/octet-stream`, which the factory later rejects with a
/// precise "no converter registered" error.
pub fn detect(payload: &[u8]) -> FormatDescriptor {
    let mime = detect_mime(payload);
    debug!(mime, len = payload.len(), "classified payload");
    // Every MIME string this module emits has a valid type/subtype split
    // and a recognized family, so the descriptor cannot fail to build.
    FormatDescriptor::from_mime(mime).unwrap_or_else(|_| FormatDescriptor {
        family: crate::format::Family::Document,
        subtype: "octet-stream".to_string(),
        mime_type: "application/octet-stream".to_string(),
    })
}

fn detect_mime(payload: &[u8]) -> &'static str {
    if payload.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if payload.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if payload.starts_with(b"\xFF\xD8\xFF") {
        return "image/jpeg";
    }
    if payload.starts_with(b"GIF87a") || payload.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if payload.len() >= 12 && payload.starts_with(b"RIFF") && &payload[8..12] == b"WEBP" {
        return "image/webp";
    }
    if payload.starts_with(b"II*\x00") || payload.starts_with(b"MM\x00*") {
        return "image/tiff";
    }
    if payload.starts_with(b"BM") {
        return "image/bmp";
    }
    // ISO-BMFF: box size (4) + "ftyp" + major brand + minor version +
    // compatible brands.
    if payload.len() >= 12 && &payload[4..8] == b"ftyp" && ftyp_is_avif(payload) {
        return "image/avif";
    }
    // MOBI keeps its signature inside the PalmDB header, not at offset 0.
    if payload.len() >= 68 && &payload[60..68] == b"BOOKMOBI" {
        return "application/x-mobipocket-ebook";
    }
    if payload.starts_with(b"PK\x03\x04") {
        return classify_zip(payload);
    }
    if looks_like_text(payload) {
        // CSV is the only text format any converter accepts, so printable
        // text without a magic number is assumed to be it.
        return "text/csv";
    }
    "application/octet-stream"
}

/// Distinguish the ZIP-container formats by their member names.
fn classify_zip(payload: &[u8]) -> &'static str {
    // EPUB mandates an uncompressed `mimetype` first member, which puts
    // the literal string near the start of the file. Checking the prefix
    // avoids parsing the archive for the common case.
    let prefix = &payload[..payload.len().min(128)];
    if contains(prefix, b"application/epub+zip") {
        return "application/epub+zip";
    }

    let Ok(archive) = zip::ZipArchive::new(Cursor::new(payload)) else {
        // Truncated or corrupt archive: report the container format and
        // let the factory reject it.
        return "application/zip";
    };
    for name in archive.file_names() {
        if name.starts_with("word/") {
            return "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        }
        if name.starts_with("xl/") {
            return "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
        }
        if name == "mimetype" {
            return "application/epub+zip";
        }
    }
    "application/zip"
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Whether an `ftyp` box declares AVIF. Encoders may emit `avis`
/// (image sequences) or `mif1` as the major brand with `avif` listed
/// only among the compatible brands, so both positions are checked.
fn ftyp_is_avif(payload: &[u8]) -> bool {
    let major = &payload[8..12];
    if major == b"avif" || major == b"avis" {
        return true;
    }
    let box_size = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let end = box_size.min(payload.len()).min(SNIFF_LEN);
    payload
        .get(16..end)
        .is_some_and(|brands| brands.chunks_exact(4).any(|b| b == b"avif"))
}

/// Heuristic: valid UTF-8 in the sniff window with no NUL bytes.
///
/// A multi-byte sequence cut at the window edge must not fail the check,
/// so a trailing invalid suffix shorter than 4 bytes is tolerated.
fn looks_like_text(payload: &[u8]) -> bool {
    if payload.is_empty() {
        return false;
    }
    let window = &payload[..payload.len().min(SNIFF_LEN)];
    if window.contains(&0) {
        return false;
    }
    match std::str::from_utf8(window) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && window.len() - e.valid_up_to() < 4,
    }
}
