//! Raster image converters: PNG, JPEG, GIF, WEBP, TIFF, BMP.
//!
//! All six source formats share one pipeline — decode to a `DynamicImage`,
//! re-encode as the target — so a single [`Raster`] converter carries a
//! [`RasterKind`] tag instead of six near-identical types. What differs
//! per kind is only the capability matrix and the decoder hint. AVIF is
//! an encode-only target: no AVIF decoder ships in this build, so no
//! converter fronts it as a source.
//!
//! Encoding is CPU-bound and runs under `spawn_blocking`. The `image`
//! crate encodes PNG/JPEG/GIF/TIFF/BMP; WEBP goes through the `webp`
//! crate and AVIF through `ravif`, because `image` has no lossy encoder
//! for either.

use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::debug;

use crate::config::EngineConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::format::{self, CapabilityMatrix, Family};

/// Tag identifying which raster format a [`Raster`] converter fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Tiff,
    Bmp,
}

impl RasterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterKind::Png => format::PNG,
            RasterKind::Jpeg => format::JPEG,
            RasterKind::Gif => format::GIF,
            RasterKind::Webp => format::WEBP,
            RasterKind::Tiff => format::TIFF,
            RasterKind::Bmp => format::BMP,
        }
    }

    fn decode_format(&self) -> image::ImageFormat {
        match self {
            RasterKind::Png => image::ImageFormat::Png,
            RasterKind::Jpeg => image::ImageFormat::Jpeg,
            RasterKind::Gif => image::ImageFormat::Gif,
            RasterKind::Webp => image::ImageFormat::WebP,
            RasterKind::Tiff => image::ImageFormat::Tiff,
            RasterKind::Bmp => image::ImageFormat::Bmp,
        }
    }

    /// Raster targets this kind offers. Every kind converts to every
    /// other raster format except that AVIF is produced only where the
    /// source decodes with full fidelity (BMP's indexed palettes do not).
    fn image_targets(&self) -> &'static [&'static str] {
        use format::{AVIF, BMP, GIF, JPEG, JPG, PNG, TIFF, WEBP};
        match self {
            RasterKind::Png => &[AVIF, JPG, JPEG, GIF, WEBP, TIFF, BMP],
            RasterKind::Jpeg => &[AVIF, PNG, GIF, WEBP, TIFF, BMP],
            RasterKind::Gif => &[AVIF, JPG, JPEG, PNG, WEBP, TIFF, BMP],
            RasterKind::Webp => &[AVIF, JPG, JPEG, PNG, GIF, TIFF, BMP],
            RasterKind::Tiff => &[AVIF, JPG, JPEG, PNG, GIF, WEBP, BMP],
            RasterKind::Bmp => &[JPG, JPEG, PNG, GIF, TIFF, WEBP],
        }
    }

    fn matrix(&self) -> CapabilityMatrix {
        CapabilityMatrix::new()
            .with(Family::Image, self.image_targets())
            .with(Family::Document, &[format::PDF])
    }
}

/// Converter for one classified raster upload.
///
/// Both output shapes are single files (a re-encoded image or a one-page
/// PDF), so raster conversions never package an archive and the upload
/// name plays no part in the output.
#[derive(Debug)]
pub struct Raster {
    kind: RasterKind,
    config: EngineConfig,
    matrix: CapabilityMatrix,
}

impl Raster {
    pub fn new(kind: RasterKind, config: &EngineConfig) -> Self {
        Self {
            kind,
            config: config.clone(),
            matrix: kind.matrix(),
        }
    }
}

#[async_trait]
impl Converter for Raster {
    fn kind(&self) -> &'static str {
        self.kind.as_str()
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
            .ensure(self.kind.as_str(), target_family, target_subtype)?;

        let kind = self.kind;
        let config = self.config.clone();
        match family {
            Family::Image => {
                let target = target_subtype.to_string();
                tokio::task::spawn_blocking(move || {
                    let img = decode(kind, &payload)?;
                    encode(kind.as_str(), &img, &target, &config)
                })
                .await
                .map_err(|e| ConvertError::Internal(format!("image task failed: {e}")))?
            }
            // A one-page PDF is a single unit: return the raw bytes, no
            // archive wrapping.
            Family::Document => tokio::task::spawn_blocking(move || {
                let img = decode(kind, &payload)?;
                raster_to_pdf(&img)
            })
            .await
            .map_err(|e| ConvertError::Internal(format!("image task failed: {e}")))?,
            Family::Ebook => Err(ConvertError::NotImplemented {
                source_format: self.kind.as_str(),
                target: format!("{target_family}/{target_subtype}"),
            }),
        }
    }
}

/// Decode a payload as the format its classification promised.
pub(crate) fn decode(kind: RasterKind, payload: &[u8]) -> Result<DynamicImage, ConvertError> {
    image::load_from_memory_with_format(payload, kind.decode_format()).map_err(|e| {
        ConvertError::Decode {
            subtype: kind.as_str(),
            detail: e.to_string(),
        }
    })
}

/// Encode a decoded image as `target` using the configured quality knobs.
pub(crate) fn encode(
    source_format: &'static str,
    img: &DynamicImage,
    target: &str,
    config: &EngineConfig,
) -> Result<Vec<u8>, ConvertError> {
    let bytes = match target {
        format::PNG => encode_with_image_crate(img, image::ImageFormat::Png)?,
        format::JPG | format::JPEG => {
            // The JPEG encoder rejects alpha channels.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let mut buf = Vec::new();
            let mut cursor = Cursor::new(&mut buf);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut cursor,
                config.jpeg_quality,
            );
            rgb.write_with_encoder(encoder)
                .map_err(|e| ConvertError::Internal(format!("JPEG encode failed: {e}")))?;
            buf
        }
        format::GIF => encode_with_image_crate(img, image::ImageFormat::Gif)?,
        format::TIFF => encode_with_image_crate(img, image::ImageFormat::Tiff)?,
        format::BMP => encode_with_image_crate(img, image::ImageFormat::Bmp)?,
        format::WEBP => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            webp::Encoder::from_rgba(rgba.as_raw(), w, h)
                .encode(config.webp_quality)
                .to_vec()
        }
        format::AVIF => {
            let rgb_img = img.to_rgb8();
            let (w, h) = rgb_img.dimensions();
            let pixels: Vec<rgb::RGB8> = rgb_img
                .as_raw()
                .chunks_exact(3)
                .map(|c| rgb::RGB8::new(c[0], c[1], c[2]))
                .collect();
            let encoded = ravif::Encoder::new()
                .with_quality(config.avif_quality)
                .with_speed(config.avif_speed)
                .encode_rgb(ravif::Img::new(pixels.as_slice(), w as usize, h as usize))
                .map_err(|e| ConvertError::Internal(format!("AVIF encode failed: {e}")))?;
            encoded.avif_file
        }
        other => {
            return Err(ConvertError::NotImplemented {
                source_format,
                target: format!("image/{other}"),
            })
        }
    };
    debug!(target, bytes = bytes.len(), "encoded raster image");
    Ok(bytes)
}

fn encode_with_image_crate(
    img: &DynamicImage,
    fmt: image::ImageFormat,
) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), fmt)
        .map_err(|e| ConvertError::Internal(format!("{fmt:?} encode failed: {e}")))?;
    Ok(buf)
}

/// Build a single-page PDF sized to the image, one point per pixel.
///
/// Runs inside `spawn_blocking`; pdfium is CPU-bound and not safe to
/// drive from async contexts.
pub(crate) fn raster_to_pdf(img: &DynamicImage) -> Result<Vec<u8>, ConvertError> {
    let render_err = |e: PdfiumError| ConvertError::Render {
        page: 1,
        detail: format!("{e:?}"),
    };

    let pdfium = Pdfium::default();
    let mut document = pdfium.create_new_pdf().map_err(render_err)?;

    let width = PdfPoints::new(img.width() as f32);
    let height = PdfPoints::new(img.height() as f32);
    let mut page = document
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::Custom(width, height))
        .map_err(render_err)?;

    page.objects_mut()
        .create_image_object(
            PdfPoints::new(0.0),
            PdfPoints::new(0.0),
            img,
            Some(width),
            Some(height),
        )
        .map_err(render_err)?;

    document.save_to_bytes().map_err(render_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([200, 40, 40, 255])))
    }

    fn png_bytes() -> Vec<u8> {
        encode(format::PNG, &sample(), format::PNG, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn decode_enforces_declared_format() {
        let png = png_bytes();
        assert!(decode(RasterKind::Png, &png).is_ok());

        // PNG bytes presented as JPEG must not decode.
        let err = decode(RasterKind::Jpeg, &png).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { subtype: "jpeg", .. }));
    }

    #[test]
    fn encode_round_trips_through_lossless_targets() {
        let config = EngineConfig::default();
        for target in [format::PNG, format::BMP, format::TIFF, format::GIF] {
            let bytes = encode(format::PNG, &sample(), target, &config).unwrap();
            let img = image::load_from_memory(&bytes)
                .unwrap_or_else(|e| panic!("decode {target}: {e}"));
            assert_eq!((img.width(), img.height()), (8, 6), "{target}");
        }
    }

    #[test]
    fn jpeg_encode_drops_alpha() {
        let bytes = encode(format::PNG, &sample(), format::JPEG, &EngineConfig::default()).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn webp_encode_emits_riff_container() {
        let bytes = encode(format::PNG, &sample(), format::WEBP, &EngineConfig::default()).unwrap();
        assert!(bytes.starts_with(b"RIFF"));
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn avif_encode_emits_ftyp_brand() {
        let bytes = encode(format::PNG, &sample(), format::AVIF, &EngineConfig::default()).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
        assert_eq!(&bytes[8..12], b"avif");
    }

    #[test]
    fn matrices_match_declared_targets() {
        let png = RasterKind::Png.matrix();
        assert!(png.allows(Family::Image, format::AVIF));
        assert!(png.allows(Family::Document, format::PDF));
        assert!(!png.allows(Family::Image, format::PNG));

        let bmp = RasterKind::Bmp.matrix();
        assert!(!bmp.allows(Family::Image, format::AVIF));
        assert!(bmp.allows(Family::Document, format::PDF));
    }

    #[tokio::test]
    async fn unsupported_targets_fail_before_decoding() {
        let conv = Raster::new(RasterKind::Png, &EngineConfig::default());

        // Garbage payload: the matrix check must reject first.
        let err = conv
            .convert_to("ebook", "epub", b"not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedTargetType { .. }));

        let err = conv
            .convert_to("image", "png", b"not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedTargetSubtype { .. }));
    }

    #[tokio::test]
    async fn converts_png_to_bmp() {
        let conv = Raster::new(RasterKind::Png, &EngineConfig::default());
        let out = conv
            .convert_to("image", format::BMP, png_bytes())
            .await
            .unwrap();
        assert!(out.starts_with(b"BM"));
    }
}
