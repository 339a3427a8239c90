//! The [`Converter`] trait implemented by every format.
//!
//! A converter is built by the factory for one classified upload and
//! answers two questions: *what can this file become* (its capability
//! matrix) and *turn it into that* (`convert_to`). Validation against the
//! matrix always happens before the payload is decoded, so unsupported
//! requests cost nothing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ConvertError;
use crate::format::{CapabilityMatrix, FormatDescriptor};

/// A finished conversion: the produced bytes and what they classify as.
///
/// `output` comes from re-sniffing the bytes, never from echoing the
/// requested target, so a delegated conversion that silently produced
/// the wrong thing is visible to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,
    pub output: FormatDescriptor,
}

/// A source file that knows how to convert itself to other formats.
#[async_trait]
pub trait Converter: Send + Sync + std::fmt::Debug {
    /// Canonical subtype of the source format, e.g. `"png"` or `"xlsx"`.
    fn kind(&self) -> &'static str;

    /// Targets this source format can be converted to.
    fn supported_formats(&self) -> &CapabilityMatrix;

    /// [`Converter::supported_formats`] expanded to full MIME types,
    /// keyed by family name. Used by front-ends to render target menus.
    fn supported_mime_types(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.supported_formats().as_mime_map()
    }

    /// Convert the payload to `target_family`/`target_subtype`.
    ///
    /// Implementations validate the target against their matrix first and
    /// return [`ConvertError::UnsupportedTargetType`] or
    /// [`ConvertError::UnsupportedTargetSubtype`] without touching the
    /// payload. On success, single-unit outputs (raster targets,
    /// image→PDF) are the converted file itself; fan-outs (PDF pages,
    /// workbook sheets) and delegated document/ebook conversions return a
    /// ZIP archive of the produced files.
    async fn convert_to(
        &self,
        target_family: &str,
        target_subtype: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ConvertError>;
}
