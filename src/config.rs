//! Configuration types for the conversion engine.
//!
//! All behaviour is controlled through [`EngineConfig`], built via its
//! [`EngineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across requests, serialise them for logging,
//! and diff two runs to understand why their outputs differ.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConvertError;

/// Configuration shared by every converter.
///
/// Built via [`EngineConfig::builder()`] or using
/// [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use filemorph::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .render_width(1600)
///     .jpeg_quality(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target pixel width of each page rendered from a PDF. Range: 16–8000. Default: 2000.
    ///
    /// 2000 px keeps text legible at full-screen zoom while a 100-page
    /// document still renders in a few seconds. Height scales to preserve
    /// the page aspect ratio.
    pub render_width: u32,

    /// JPEG encoder quality, 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// WEBP encoder quality, 0.0–100.0. Default: 80.0.
    pub webp_quality: f32,

    /// AVIF encoder quality, 1.0–100.0. Default: 80.0.
    pub avif_quality: f32,

    /// AVIF encoder speed, 1 (slow, small) to 10 (fast, large). Default: 6.
    ///
    /// AVIF encode time varies by an order of magnitude across this range.
    /// 6 keeps a 4K photo under a second without a visible quality drop.
    pub avif_speed: u8,

    /// Deadline for a single external-tool invocation in seconds. Default: 120.
    ///
    /// LibreOffice can take over a minute on a large spreadsheet and
    /// Calibre on a heavily-illustrated ebook; two minutes covers both
    /// with headroom. On expiry the child process is killed and the
    /// conversion fails with [`ConvertError::ConversionTimeout`].
    pub tool_timeout_secs: u64,

    /// Program invoked for office-document conversions. Default: `soffice`.
    ///
    /// Resolved through `PATH` unless an absolute path is given.
    pub soffice_program: String,

    /// Program invoked for ebook conversions. Default: `ebook-convert`.
    pub ebook_convert_program: String,

    /// Directory under which per-conversion scratch directories are
    /// created. `None` uses the system temp directory.
    pub temp_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_width: 2000,
            jpeg_quality: 85,
            webp_quality: 80.0,
            avif_quality: 80.0,
            avif_speed: 6,
            tool_timeout_secs: 120,
            soffice_program: "soffice".to_string(),
            ebook_convert_program: "ebook-convert".to_string(),
            temp_root: None,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px.clamp(16, 8000);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn webp_quality(mut self, q: f32) -> Self {
        self.config.webp_quality = q.clamp(0.0, 100.0);
        self
    }

    pub fn avif_quality(mut self, q: f32) -> Self {
        self.config.avif_quality = q.clamp(1.0, 100.0);
        self
    }

    pub fn avif_speed(mut self, s: u8) -> Self {
        self.config.avif_speed = s.clamp(1, 10);
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn soffice_program(mut self, program: impl Into<String>) -> Self {
        self.config.soffice_program = program.into();
        self
    }

    pub fn ebook_convert_program(mut self, program: impl Into<String>) -> Self {
        self.config.ebook_convert_program = program.into();
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, ConvertError> {
        let c = &self.config;
        if c.tool_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "tool_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.soffice_program.is_empty() || c.ebook_convert_program.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "external tool program names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
