//! PDF converter: page rasterisation via pdfium, DOCX export via
//! LibreOffice.
//!
//! A PDF fans out to one image per page. Page `n` (1-indexed) becomes
//! archive entry `{stem}_{n}.{target}`, and the whole set is returned as
//! one ZIP archive so a 300-page document is still a single download.

use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::archive::{self, ConversionUnit};
use crate::config::EngineConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::families::image::encode;
use crate::families::stem;
use crate::format::{self, CapabilityMatrix, Family};

#[derive(Debug)]
pub struct Pdf {
    filename: String,
    config: EngineConfig,
    matrix: CapabilityMatrix,
}

impl Pdf {
    pub fn new(filename: &str, config: &EngineConfig) -> Self {
        use format::{DOCX, GIF, JPEG, JPG, PNG, TIFF, WEBP};
        Self {
            filename: filename.to_string(),
            config: config.clone(),
            matrix: CapabilityMatrix::new()
                .with(Family::Image, &[GIF, JPG, JPEG, PNG, TIFF, WEBP])
                .with(Family::Document, &[DOCX]),
        }
    }
}

#[async_trait]
impl Converter for Pdf {
    fn kind(&self) -> &'static str {
        format::PDF
    }

    fn supported_formats(&self) -> &CapabilityMatrix {
        &self.matrix
    }

    async fn convert_to(
        &self,
        target_family: &str,
        target_subtype: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ConvertError> {
        let family = self
            .matrix
            .ensure(format::PDF, target_family, target_subtype)?;

        let base = stem(&self.filename);
        match family {
            Family::Image => {
                let config = self.config.clone();
                let target = target_subtype.to_string();
                let units = tokio::task::spawn_blocking(move || {
                    render_to_units(&payload, &base, &target, &config)
                })
                .await
                .map_err(|e| ConvertError::Internal(format!("render task failed: {e}")))??;
                archive::package_units(units)
            }
            Family::Document => {
                let docx =
                    crate::tool::run_soffice(&self.config, &base, format::PDF, format::DOCX, &payload)
                        .await?;
                archive::package_single(format!("{base}.docx"), docx)
            }
            Family::Ebook => Err(ConvertError::NotImplemented {
                source_format: format::PDF,
                target: format!("{target_family}/{target_subtype}"),
            }),
        }
    }
}

/// Rasterise every page and encode it as `target`.
///
/// Runs inside `spawn_blocking`: pdfium wraps a C++ library with
/// thread-local state that must not be driven from async contexts.
fn render_to_units(
    payload: &[u8],
    base: &str,
    target: &str,
    config: &EngineConfig,
) -> Result<Vec<ConversionUnit>, ConvertError> {
    let pages = render_pages(payload, config)?;
    let mut units = Vec::with_capacity(pages.len());
    for (idx, image) in pages {
        let bytes = encode(format::PDF, &image, target, config)?;
        units.push(ConversionUnit::new(
            idx,
            format!("{base}_{}.{target}", idx + 1),
            bytes,
        ));
    }
    Ok(units)
}

/// Render all pages of a PDF held in memory.
///
/// Pages render at `config.render_width` pixels wide, height scaled to
/// preserve the page aspect ratio.
pub(crate) fn render_pages(
    payload: &[u8],
    config: &EngineConfig,
) -> Result<Vec<(usize, DynamicImage)>, ConvertError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_slice(payload, None)
        .map_err(|e| ConvertError::Decode {
            subtype: format::PDF,
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!(pages = total, "rendering PDF");

    let render_config = PdfRenderConfig::new().set_target_width(config.render_width as i32);

    let mut results = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::Render {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
        let image = bitmap.as_image();
        debug!(page = idx + 1, width = image.width(), height = image.height(), "rendered page");
        results.push((idx, image));
    }
    Ok(results)
}
