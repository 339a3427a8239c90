//! Ebook converters: EPUB and MOBI via Calibre's `ebook-convert`.
//!
//! Both formats share the delegation path — stage the payload, run the
//! tool, collect the output — so one [`Ebook`] converter carries an
//! [`EbookKind`] tag. Calibre derives the conversion pair from the input
//! and output file extensions; the adapter only has to name the files
//! correctly.

use async_trait::async_trait;

use crate::archive;
use crate::config::EngineConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::families::stem;
use crate::format::{self, CapabilityMatrix, Family};
use crate::tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbookKind {
    Epub,
    Mobi,
}

impl EbookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EbookKind::Epub => format::EPUB,
            EbookKind::Mobi => format::MOBI,
        }
    }

    /// The opposite ebook format, the only in-family target.
    fn counterpart(&self) -> &'static str {
        match self {
            EbookKind::Epub => format::MOBI,
            EbookKind::Mobi => format::EPUB,
        }
    }

    fn matrix(&self) -> CapabilityMatrix {
        CapabilityMatrix::new()
            .with(Family::Document, &[format::PDF])
            .with(Family::Ebook, &[self.counterpart()])
    }
}

#[derive(Debug)]
pub struct Ebook {
    kind: EbookKind,
    filename: String,
    config: EngineConfig,
    matrix: CapabilityMatrix,
}

impl Ebook {
    pub fn new(kind: EbookKind, filename: &str, config: &EngineConfig) -> Self {
        Self {
            kind,
            filename: filename.to_string(),
            config: config.clone(),
            matrix: kind.matrix(),
        }
    }
}

#[async_trait]
impl Converter for Ebook {
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
        self.matrix
            .ensure(self.kind.as_str(), target_family, target_subtype)?;

        // Both rows run the same delegation; only the output extension
        // differs (pdf for Document, the counterpart for Ebook).
        let base = stem(&self.filename);
        let output = tool::run_ebook_convert(
            &self.config,
            &base,
            self.kind.as_str(),
            target_subtype,
            &payload,
        )
        .await?;
        archive::package_single(format!("{base}.{target_subtype}"), output)
    }
}
