//! Per-family converter implementations.

pub mod ebook;
pub mod image;
pub mod office;
pub mod pdf;

/// Sanitized stem of an upload name, used to derive output entry names.
///
/// `report.v2.docx` → `report.v2`; hostile or empty names fall back to
/// `file`.
pub(crate) fn stem(filename: &str) -> String {
    let safe = crate::archive::sanitize_entry_name(filename, "file");
    match std::path::Path::new(&safe)
        .file_stem()
        .and_then(|s| s.to_str())
    {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "file".to_string(),
    }
}
