//! Error types for the filemorph library.
//!
//! Every failure a conversion can hit maps to one [`ConvertError`] variant,
//! grouped by the stage that produced it:
//!
//! * **Classification** — the uploaded bytes or the requested target could
//!   not be understood (`MalformedMimeType`, `UnrecognizedFamily`,
//!   `UnrecognizedSubtype`).
//! * **Capability** — the source format exists but does not offer the
//!   requested target (`UnsupportedTargetType`, `UnsupportedTargetSubtype`).
//! * **Execution** — the conversion itself failed (`Decode`, `Render`,
//!   `ExternalToolFailure`, `ConversionTimeout`, `Io`, `Packaging`).
//!
//! The split matters to callers: capability errors are the user's fault and
//! deserve a 4xx-style response, execution errors are ours and deserve a
//! 5xx-style response plus a log line.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::Family;

/// All errors returned by the filemorph library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Classification errors ─────────────────────────────────────────────
    /// A MIME string did not split into exactly `type/subtype`.
    #[error("MIME type '{mimetype}' is malformed: expected exactly one '/' separating type and subtype")]
    MalformedMimeType { mimetype: String },

    /// The family component of a MIME type maps to no converter family.
    #[error("file family '{family}' is not recognized\nRecognized families: image, document (also: application, text), ebook")]
    UnrecognizedFamily { family: String },

    /// The family is known but no converter exists for this subtype.
    #[error("no {family} converter is registered for '{subtype}'")]
    UnrecognizedSubtype { family: Family, subtype: String },

    // ── Capability errors ─────────────────────────────────────────────────
    /// The source format offers no conversions into the requested family.
    #[error("{source_format} files cannot be converted to the '{target_family}' family")]
    UnsupportedTargetType {
        source_format: &'static str,
        target_family: String,
    },

    /// The requested family is offered, but not this particular subtype.
    #[error("{source_format} files can be converted within the {target_family} family, but not to '{target_subtype}'")]
    UnsupportedTargetSubtype {
        source_format: &'static str,
        target_family: Family,
        target_subtype: String,
    },

    /// A pairing is declared in a capability matrix but has no code path.
    ///
    /// Seeing this in production means a matrix row was added without its
    /// implementation; the matrix and the `convert_to` match must move
    /// together.
    #[error("conversion from {source_format} to '{target}' is declared but not implemented")]
    NotImplemented {
        source_format: &'static str,
        target: String,
    },

    // ── Execution errors ──────────────────────────────────────────────────
    /// Input bytes claimed to be `subtype` but would not decode as it.
    #[error("failed to decode input as {subtype}: {detail}")]
    Decode { subtype: &'static str, detail: String },

    /// pdfium failed while rendering or assembling a document.
    #[error("rendering failed on page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// An external program exited non-zero (or wrote to stderr where that
    /// is treated as fatal).
    #[error("'{tool}' failed (exit status {status:?})\n{stderr}")]
    ExternalToolFailure {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// An external program exceeded the configured deadline and was killed.
    #[error("'{tool}' did not finish within {secs}s and was killed\nIncrease tool_timeout_secs for large inputs.")]
    ConversionTimeout { tool: String, secs: u64 },

    /// File-system failure while staging input/output for an external tool.
    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the result archive failed.
    #[error("failed to write archive entry '{entry}': {source}")]
    Packaging {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Whether this error was caused by the request (unknown format,
    /// unsupported pairing) rather than by the conversion machinery.
    ///
    /// Front-ends use this to pick a client-error vs server-error status.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ConvertError::MalformedMimeType { .. }
                | ConvertError::UnrecognizedFamily { .. }
                | ConvertError::UnrecognizedSubtype { .. }
                | ConvertError::UnsupportedTargetType { .. }
                | ConvertError::UnsupportedTargetSubtype { .. }
                | ConvertError::Decode { .. }
        )
    }
}
