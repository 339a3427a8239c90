//! Top-level conversion entry point.
//!
//! One call does the whole journey: classify the payload by content,
//! build the right converter through the two-level factory, run the
//! conversion, and classify the *output* bytes so the caller learns what
//! was actually produced rather than what was asked for.

use tracing::info;

use crate::config::EngineConfig;
use crate::converter::ConversionResult;
use crate::error::ConvertError;
use crate::factory;
use crate::format::{self, FormatDescriptor};
use crate::mime;

/// Convert `payload` to `target_family`/`target_subtype`.
///
/// `filename` is advisory: it never influences classification, only the
/// names of output archive entries.
///
/// # Example
/// ```rust,no_run
/// use filemorph::{convert, EngineConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let payload = std::fs::read("photo.png")?;
///     let result = convert("photo.png", payload, "image", "webp", &EngineConfig::default()).await?;
///     std::fs::write("photo.webp", &result.bytes)?;
///     println!("produced {}", result.output.mime_type);
///     Ok(())
/// }
/// ```
pub async fn convert(
    filename: &str,
    payload: Vec<u8>,
    target_family: &str,
    target_subtype: &str,
    config: &EngineConfig,
) -> Result<ConversionResult, ConvertError> {
    let input = mime::detect(&payload);
    info!(
        filename,
        input = %input.mime_type,
        target_family,
        target_subtype,
        bytes = payload.len(),
        "starting conversion"
    );

    // Route on the raw MIME split, not the descriptor family name, so
    // the factory sees the same subtype strings classification emits.
    let (mime_family, mime_subtype) = format::split_mime(&input.mime_type)?;
    let route_family = if input.family == format::Family::Ebook {
        "ebook"
    } else {
        mime_family
    };

    let factory = factory::family_factory(route_family, filename, config)?;
    let converter = factory.new_file(mime_subtype)?;

    let bytes = converter
        .convert_to(target_family, target_subtype, payload)
        .await?;
    let output = mime::detect(&bytes);
    info!(output = %output.mime_type, bytes = bytes.len(), "conversion finished");

    Ok(ConversionResult { bytes, output })
}

/// Blocking wrapper around [`convert`] for synchronous callers.
///
/// Creates a Tokio runtime internally; do not call from within one.
pub fn convert_sync(
    filename: &str,
    payload: Vec<u8>,
    target_family: &str,
    target_subtype: &str,
    config: &EngineConfig,
) -> Result<ConversionResult, ConvertError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ConvertError::Internal(format!("failed to create runtime: {e}")))?;
    runtime.block_on(convert(
        filename,
        payload,
        target_family,
        target_subtype,
        config,
    ))
}

/// Classify a payload by content without converting it.
pub fn classify(payload: &[u8]) -> FormatDescriptor {
    mime::detect(payload)
}
