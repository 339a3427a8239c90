//! # filemorph
//!
//! Classify a file by its content and convert it across image, document,
//! and ebook formats.
//!
//! ## Why this crate?
//!
//! File extensions and client-supplied MIME types lie. filemorph sniffs
//! the actual bytes, looks the detected format up in a per-format
//! capability matrix, and only then converts — so an unsupported request
//! fails with a precise error before any work happens, and the caller is
//! told what the output bytes *actually are*, not what was asked for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes
//!  │
//!  ├─ 1. Classify  magic-byte sniffing → FormatDescriptor
//!  ├─ 2. Factory   family → FormatFactory, subtype → Converter
//!  ├─ 3. Validate  target checked against the capability matrix
//!  ├─ 4. Convert   in-process (image/pdfium/calamine) or delegated
//!  │               (soffice, ebook-convert) with drained pipes + timeout
//!  ├─ 5. Package   multi-unit outputs → single zip archive
//!  └─ 6. Reclassify  output bytes sniffed again → ConversionResult
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use filemorph::{convert, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let payload = std::fs::read("report.docx")?;
//!     let config = EngineConfig::default();
//!     let result = convert("report.docx", payload, "document", "pdf", &config).await?;
//!     // Delegated office conversions come back zip-wrapped.
//!     assert_eq!(result.output.mime_type, "application/zip");
//!     std::fs::write("report.zip", &result.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Conversion inventory
//!
//! | Source | In-process | Delegated |
//! |--------|-----------|-----------|
//! | PNG/JPEG/GIF/WEBP/TIFF/BMP | raster targets (incl. AVIF) + raw PDF (pdfium) | — |
//! | PDF | page rasterisation (pdfium) | DOCX (soffice) |
//! | XLSX | CSV per sheet (calamine) | — |
//! | DOCX, CSV | — | PDF / XLSX (soffice) |
//! | EPUB, MOBI | — | counterpart + PDF (ebook-convert) |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `filemorph` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! filemorph = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod factory;
pub mod families;
pub mod format;
pub mod mime;
pub mod tool;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{package_single, package_units, ConversionUnit};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use converter::{ConversionResult, Converter};
pub use engine::{classify, convert, convert_sync};
pub use error::ConvertError;
pub use factory::{family_factory, FormatFactory};
pub use format::{
    supported_file_types, CapabilityMatrix, Family, FormatDescriptor, SUPPORTED_FILE_TYPES,
};
