//! Two-level format factory: family string → [`FormatFactory`], then
//! subtype → boxed [`Converter`].
//!
//! The two levels fail differently on purpose. An unknown family is
//! [`ConvertError::UnrecognizedFamily`] ("we have no image/document/ebook
//! bucket for this"), an unknown subtype inside a known family is
//! [`ConvertError::UnrecognizedSubtype`] ("we know documents, just not
//! this one"). The long OOXML MIME subtypes and the ebook MIME subtypes
//! are accepted alongside their short names, since classification
//! produces the long forms.

use crate::config::EngineConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::families::ebook::{Ebook, EbookKind};
use crate::families::image::{Raster, RasterKind};
use crate::families::office::{Csv, Docx, Xlsx};
use crate::families::pdf::Pdf;
use crate::format::{self, Family};

/// Build the factory for a family string (MIME aliases included).
pub fn family_factory(
    family: &str,
    filename: &str,
    config: &EngineConfig,
) -> Result<FormatFactory, ConvertError> {
    Ok(FormatFactory {
        family: family.parse()?,
        filename: filename.to_string(),
        config: config.clone(),
    })
}

/// Second factory level: constructs converters for one family, carrying
/// the upload's name (for output entry naming) and the engine config.
#[derive(Debug)]
pub struct FormatFactory {
    family: Family,
    filename: String,
    config: EngineConfig,
}

impl FormatFactory {
    pub fn family(&self) -> Family {
        self.family
    }

    /// Construct the converter for `subtype` within this factory's family.
    pub fn new_file(&self, subtype: &str) -> Result<Box<dyn Converter>, ConvertError> {
        let subtype = subtype.to_ascii_lowercase();
        let raster = |kind| Box::new(Raster::new(kind, &self.config)) as Box<dyn Converter>;

        let converter: Box<dyn Converter> = match self.family {
            // AVIF is deliberately absent: it is an encode-only target
            // with no source converter.
            Family::Image => match subtype.as_str() {
                format::PNG => raster(RasterKind::Png),
                format::JPG | format::JPEG => raster(RasterKind::Jpeg),
                format::GIF => raster(RasterKind::Gif),
                format::WEBP => raster(RasterKind::Webp),
                format::TIFF => raster(RasterKind::Tiff),
                format::BMP => raster(RasterKind::Bmp),
                _ => return Err(self.unrecognized(subtype)),
            },
            Family::Document => match subtype.as_str() {
                format::PDF => Box::new(Pdf::new(&self.filename, &self.config)),
                format::DOCX | format::DOCX_MIME_SUBTYPE => {
                    Box::new(Docx::new(&self.filename, &self.config))
                }
                format::XLSX | format::XLSX_MIME_SUBTYPE => {
                    Box::new(Xlsx::new(&self.filename, &self.config))
                }
                format::CSV => Box::new(Csv::new(&self.filename, &self.config)),
                _ => return Err(self.unrecognized(subtype)),
            },
            Family::Ebook => match subtype.as_str() {
                format::EPUB | format::EPUB_MIME_SUBTYPE => {
                    Box::new(Ebook::new(EbookKind::Epub, &self.filename, &self.config))
                }
                format::MOBI | format::MOBI_MIME_SUBTYPE => {
                    Box::new(Ebook::new(EbookKind::Mobi, &self.filename, &self.config))
                }
                _ => return Err(self.unrecognized(subtype)),
            },
        };
        Ok(converter)
    }

    fn unrecognized(&self, subtype: String) -> ConvertError {
        ConvertError::UnrecognizedSubtype {
            family: self.family,
            subtype,
        }
    }
}
