//! Format vocabulary: families, subtypes, descriptors, capability matrices.
//!
//! Three converter families exist — [`Family::Image`], [`Family::Document`],
//! and [`Family::Ebook`]. MIME top-level types are folded into them when
//! parsing: `application` and `text` both land in `Document`, because PDFs
//! arrive as `application/pdf` and CSVs as `text/csv` yet share one
//! conversion space.
//!
//! Every converter publishes a [`CapabilityMatrix`]: the ordered list of
//! (family, subtypes) pairs it can produce. The matrix is consulted *before*
//! any decoding happens, so an unsupported request fails fast without
//! touching the payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::ConvertError;

// ── Subtype constants ────────────────────────────────────────────────────
// Canonical lowercase subtype identifiers used in matrices and factories.

pub const PNG: &str = "png";
pub const JPG: &str = "jpg";
pub const JPEG: &str = "jpeg";
pub const GIF: &str = "gif";
pub const WEBP: &str = "webp";
pub const TIFF: &str = "tiff";
pub const BMP: &str = "bmp";
pub const AVIF: &str = "avif";

pub const PDF: &str = "pdf";
pub const DOCX: &str = "docx";
pub const DOCX_MIME_SUBTYPE: &str =
    "vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX: &str = "xlsx";
pub const XLSX_MIME_SUBTYPE: &str =
    "vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV: &str = "csv";

pub const EPUB: &str = "epub";
pub const EPUB_MIME_SUBTYPE: &str = "epub+zip";
pub const MOBI: &str = "mobi";
pub const MOBI_MIME_SUBTYPE: &str = "x-mobipocket-ebook";

// ── Family ───────────────────────────────────────────────────────────────

/// A converter family. Parsing folds the MIME top-level types
/// `application` and `text` into [`Family::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Image,
    Document,
    Ebook,
}

impl Family {
    /// Canonical lowercase name, as used in request strings and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Image => "image",
            Family::Document => "document",
            Family::Ebook => "ebook",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Family::Image),
            "document" | "application" | "text" => Ok(Family::Document),
            "ebook" => Ok(Family::Ebook),
            other => Err(ConvertError::UnrecognizedFamily {
                family: other.to_string(),
            }),
        }
    }
}

// ── Descriptor ───────────────────────────────────────────────────────────

/// What a payload was classified as: full MIME type plus the family and
/// subtype derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    pub family: Family,
    pub subtype: String,
    pub mime_type: String,
}

impl FormatDescriptor {
    /// Build a descriptor from a full MIME string.
    ///
    /// Fails with [`ConvertError::MalformedMimeType`] if the string does not
    /// split into exactly `type/subtype`, or [`ConvertError::UnrecognizedFamily`]
    /// if the type component maps to no family.
    pub fn from_mime(mime_type: &str) -> Result<Self, ConvertError> {
        let (ftype, subtype) = split_mime(mime_type)?;
        let mut family: Family = ftype.parse()?;
        // Ebooks ship under `application/...` MIME types but convert in
        // their own family.
        if family == Family::Document && matches!(subtype, EPUB_MIME_SUBTYPE | MOBI_MIME_SUBTYPE) {
            family = Family::Ebook;
        }
        Ok(FormatDescriptor {
            family,
            subtype: subtype.to_string(),
            mime_type: mime_type.to_string(),
        })
    }
}

/// Split a MIME string into its `(type, subtype)` components.
///
/// Exactly one `/` is required; parameters (`;charset=...`) are not
/// accepted here because classification never produces them.
pub fn split_mime(mime_type: &str) -> Result<(&str, &str), ConvertError> {
    let mut parts = mime_type.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(t), Some(s), None) if !t.is_empty() && !s.is_empty() => Ok((t, s)),
        _ => Err(ConvertError::MalformedMimeType {
            mimetype: mime_type.to_string(),
        }),
    }
}

/// Full MIME type for a known subtype.
///
/// Subtypes without a registered MIME type fall back to `family/subtype`,
/// which is correct for every plain raster format.
pub fn mime_for(family: Family, subtype: &str) -> String {
    match subtype {
        JPG | JPEG => "image/jpeg".to_string(),
        PDF => "application/pdf".to_string(),
        DOCX | DOCX_MIME_SUBTYPE => format!("application/{DOCX_MIME_SUBTYPE}"),
        XLSX | XLSX_MIME_SUBTYPE => format!("application/{XLSX_MIME_SUBTYPE}"),
        CSV => "text/csv".to_string(),
        EPUB => "application/epub+zip".to_string(),
        MOBI | MOBI_MIME_SUBTYPE => format!("application/{MOBI_MIME_SUBTYPE}"),
        other => match family {
            Family::Image => format!("image/{other}"),
            Family::Document => format!("application/{other}"),
            Family::Ebook => format!("application/{other}"),
        },
    }
}

// ── Capability matrix ────────────────────────────────────────────────────

/// The conversions a single source format offers, ordered by family.
///
/// Order is part of the contract: UIs render target menus straight from
/// [`CapabilityMatrix::entries`], so insertion order is preserved rather
/// than sorted.
#[derive(Debug, Clone, Default)]
pub struct CapabilityMatrix {
    entries: Vec<(Family, Vec<&'static str>)>,
}

impl CapabilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a family row. Each family may appear at most once; callers
    /// construct matrices statically so this is asserted rather than
    /// surfaced as an error.
    pub fn with(mut self, family: Family, subtypes: &[&'static str]) -> Self {
        debug_assert!(
            !self.entries.iter().any(|(f, _)| *f == family),
            "family {family} listed twice"
        );
        self.entries.push((family, subtypes.to_vec()));
        self
    }

    /// Ordered `(family, subtypes)` rows.
    pub fn entries(&self) -> &[(Family, Vec<&'static str>)] {
        &self.entries
    }

    /// Target subtypes offered within `family`, or `None` if the family
    /// is absent entirely.
    pub fn supports(&self, family: Family) -> Option<&[&'static str]> {
        self.entries
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, subs)| subs.as_slice())
    }

    /// Whether `family/subtype` is an offered target.
    pub fn allows(&self, family: Family, subtype: &str) -> bool {
        self.supports(family)
            .is_some_and(|subs| subs.iter().any(|s| *s == subtype))
    }

    /// Validate a requested target against this matrix, resolving the
    /// family string in the process.
    ///
    /// Returns the parsed [`Family`] on success. The error distinguishes
    /// "family not offered" from "family offered but subtype not":
    /// front-ends surface the two differently.
    pub fn ensure(
        &self,
        source_format: &'static str,
        target_family: &str,
        target_subtype: &str,
    ) -> Result<Family, ConvertError> {
        let family = match Family::from_str(target_family) {
            Ok(f) => f,
            Err(_) => {
                return Err(ConvertError::UnsupportedTargetType {
                    source_format,
                    target_family: target_family.to_string(),
                })
            }
        };
        let Some(subtypes) = self.supports(family) else {
            return Err(ConvertError::UnsupportedTargetType {
                source_format,
                target_family: target_family.to_string(),
            });
        };
        if !subtypes.iter().any(|s| *s == target_subtype) {
            return Err(ConvertError::UnsupportedTargetSubtype {
                source_format,
                target_family: family,
                target_subtype: target_subtype.to_string(),
            });
        }
        Ok(family)
    }

    /// Matrix as a plain map of family name → subtypes, for JSON output.
    pub fn as_map(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        self.entries
            .iter()
            .map(|(f, subs)| (f.as_str(), subs.clone()))
            .collect()
    }

    /// Matrix as a map of family name → full MIME types.
    pub fn as_mime_map(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.entries
            .iter()
            .map(|(f, subs)| {
                (
                    f.as_str(),
                    subs.iter().map(|s| mime_for(*f, s)).collect(),
                )
            })
            .collect()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────

/// Every subtype the engine can consume or produce, mapped to its family.
///
/// Front-ends use this to resolve a bare target subtype ("png") to the
/// family the request needs, and to render the upload form. AVIF is
/// target-only: it appears here so `--to avif` resolves, but no source
/// converter exists for it.
pub static SUPPORTED_FILE_TYPES: Lazy<BTreeMap<&'static str, Family>> = Lazy::new(|| {
    BTreeMap::from([
        (PNG, Family::Image),
        (JPG, Family::Image),
        (JPEG, Family::Image),
        (GIF, Family::Image),
        (WEBP, Family::Image),
        (TIFF, Family::Image),
        (BMP, Family::Image),
        (AVIF, Family::Image),
        (PDF, Family::Document),
        (DOCX, Family::Document),
        (XLSX, Family::Document),
        (CSV, Family::Document),
        (EPUB, Family::Ebook),
        (MOBI, Family::Ebook),
    ])
});

/// Accessor for [`SUPPORTED_FILE_TYPES`], for callers that prefer a
/// function over a static.
pub fn supported_file_types() -> &'static BTreeMap<&'static str, Family> {
    &SUPPORTED_FILE_TYPES
}
