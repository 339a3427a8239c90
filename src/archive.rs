//! Packaging conversion output into a ZIP archive.
//!
//! Conversions that fan out into several files (a multi-page PDF, a
//! multi-sheet workbook) and delegated document/ebook conversions return
//! one archive so the caller always gets a single download. Single-unit
//! in-process outputs (raster targets, image→PDF) skip packaging and
//! ship the converted bytes raw.

use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;

use crate::error::ConvertError;

/// One output file produced by a conversion, before packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionUnit {
    /// Position in the source document (page number, sheet number),
    /// 0-indexed. Units are packaged in ascending index order.
    pub index: usize,
    /// File name the unit gets inside the archive.
    pub entry_name: String,
    pub bytes: Vec<u8>,
}

impl ConversionUnit {
    pub fn new(index: usize, entry_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            index,
            entry_name: entry_name.into(),
            bytes,
        }
    }
}

/// Sanitize a file name for use as an archive entry.
///
/// Strips path components so a crafted upload name like `../../etc/passwd`
/// cannot place entries outside the extraction directory.
pub fn sanitize_entry_name(name: &str, fallback: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Package units into a deflate-compressed ZIP archive held in memory.
///
/// Entries appear in ascending unit index order regardless of the order
/// the caller produced them in.
pub fn package_units(mut units: Vec<ConversionUnit>) -> Result<Vec<u8>, ConvertError> {
    units.sort_by_key(|u| u.index);

    let mut buffer = Vec::new();
    {
        let mut archive = zip::ZipWriter::new(Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for unit in &units {
            let entry = sanitize_entry_name(&unit.entry_name, &format!("unit_{}", unit.index));
            archive
                .start_file(&entry, options)
                .map_err(|source| ConvertError::Packaging {
                    entry: entry.clone(),
                    source,
                })?;
            archive
                .write_all(&unit.bytes)
                .map_err(|source| ConvertError::Packaging {
                    entry: entry.clone(),
                    source: source.into(),
                })?;
            debug!(entry, bytes = unit.bytes.len(), "packaged archive entry");
        }

        archive.finish().map_err(|source| ConvertError::Packaging {
            entry: String::new(),
            source,
        })?;
    }

    Ok(buffer)
}

/// Package a single output file.
pub fn package_single(entry_name: impl Into<String>, bytes: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
    package_units(vec![ConversionUnit::new(0, entry_name, bytes)])
}
