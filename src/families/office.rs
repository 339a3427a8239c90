//! Office document converters: DOCX, XLSX, CSV.
//!
//! DOCX→PDF and CSV→XLSX delegate to LibreOffice through the tool
//! adapter — reimplementing OOXML writing in-process buys nothing.
//! XLSX→CSV stays local: calamine reads the workbook and each sheet is
//! serialised to its own CSV entry, so a two-sheet workbook yields a
//! two-entry archive.

use async_trait::async_trait;
use std::io::Cursor;
use tracing::debug;

use crate::archive::{self, ConversionUnit};
use crate::config::EngineConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::families::stem;
use crate::format::{self, CapabilityMatrix, Family};
use crate::tool;

// ── DOCX ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Docx {
    filename: String,
    config: EngineConfig,
    matrix: CapabilityMatrix,
}

impl Docx {
    pub fn new(filename: &str, config: &EngineConfig) -> Self {
        Self {
            filename: filename.to_string(),
            config: config.clone(),
            matrix: CapabilityMatrix::new().with(Family::Document, &[format::PDF]),
        }
    }
}

#[async_trait]
impl Converter for Docx {
    fn kind(&self) -> &'static str {
        format::DOCX
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
            .ensure(format::DOCX, target_family, target_subtype)?;

        let base = stem(&self.filename);
        let pdf = tool::run_soffice(&self.config, &base, format::DOCX, format::PDF, &payload).await?;
        archive::package_single(format!("{base}.pdf"), pdf)
    }
}

// ── XLSX ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Xlsx {
    filename: String,
    matrix: CapabilityMatrix,
}

impl Xlsx {
    pub fn new(filename: &str, _config: &EngineConfig) -> Self {
        Self {
            filename: filename.to_string(),
            matrix: CapabilityMatrix::new().with(Family::Document, &[format::CSV]),
        }
    }
}

#[async_trait]
impl Converter for Xlsx {
    fn kind(&self) -> &'static str {
        format::XLSX
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
            .ensure(format::XLSX, target_family, target_subtype)?;

        let base = stem(&self.filename);
        let units = tokio::task::spawn_blocking(move || sheets_to_csv(payload, &base))
            .await
            .map_err(|e| ConvertError::Internal(format!("spreadsheet task failed: {e}")))??;
        archive::package_units(units)
    }
}

/// Serialise every sheet of a workbook to CSV, one unit per sheet in
/// workbook order. Sheet `n` (1-indexed) becomes `{base}_{n}.csv`.
fn sheets_to_csv(payload: Vec<u8>, base: &str) -> Result<Vec<ConversionUnit>, ConvertError> {
    use calamine::{Reader, Xlsx};

    let decode_err = |e: calamine::XlsxError| ConvertError::Decode {
        subtype: format::XLSX,
        detail: e.to_string(),
    };

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(payload)).map_err(decode_err)?;
    let names = workbook.sheet_names().to_owned();

    let mut units = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let range = workbook.worksheet_range(name).map_err(decode_err)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in range.rows() {
            let record: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
            writer
                .write_record(&record)
                .map_err(|e| ConvertError::Internal(format!("CSV write failed: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ConvertError::Internal(format!("CSV flush failed: {e}")))?;

        debug!(sheet = %name, rows = range.height(), "serialised sheet");
        units.push(ConversionUnit::new(
            idx,
            format!("{base}_{}.csv", idx + 1),
            bytes,
        ));
    }
    Ok(units)
}

// ── CSV ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Csv {
    filename: String,
    config: EngineConfig,
    matrix: CapabilityMatrix,
}

impl Csv {
    pub fn new(filename: &str, config: &EngineConfig) -> Self {
        Self {
            filename: filename.to_string(),
            config: config.clone(),
            matrix: CapabilityMatrix::new().with(Family::Document, &[format::XLSX]),
        }
    }
}

#[async_trait]
impl Converter for Csv {
    fn kind(&self) -> &'static str {
        format::CSV
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
            .ensure(format::CSV, target_family, target_subtype)?;

        let base = stem(&self.filename);
        let xlsx = tool::run_soffice(&self.config, &base, format::CSV, format::XLSX, &payload).await?;
        archive::package_single(format!("{base}.xlsx"), xlsx)
    }
}
