//! CLI binary for filemorph.
//!
//! A thin shim over the library crate that reads a file, runs one
//! conversion, and writes the result next to the input (or wherever
//! `-o` points).

use anyhow::{bail, Context, Result};
use clap::Parser;
use filemorph::{classify, convert, EngineConfig, FormatDescriptor, SUPPORTED_FILE_TYPES};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Image to image (bare file output)
  filemorph photo.png --to webp

  # Image to PDF (a single raw PDF file)
  filemorph photo.png --to pdf

  # Spreadsheet to CSV: one entry per sheet inside the zip
  filemorph book.xlsx --to csv

  # Office and ebook conversions shell out to external tools
  filemorph report.docx --to pdf
  filemorph novel.epub --to mobi

  # Classify without converting
  filemorph mystery.bin --classify-only --json

SUPPORTED TARGETS:
  image      png jpg jpeg gif webp tiff bmp avif
  document   pdf docx xlsx csv
  ebook      epub mobi

  What a given input can become depends on its detected format; an
  unsupported pairing is rejected before any work happens.

EXTERNAL TOOLS:
  soffice        DOCX→PDF, PDF→DOCX, CSV→XLSX     (LibreOffice)
  ebook-convert  EPUB↔MOBI, EPUB/MOBI→PDF          (Calibre)

ENVIRONMENT VARIABLES:
  FILEMORPH_SOFFICE        Path to the soffice binary
  FILEMORPH_EBOOK_CONVERT  Path to the ebook-convert binary
  FILEMORPH_TOOL_TIMEOUT   External tool deadline in seconds (default 120)
"#;

/// Convert files between image, document, and ebook formats.
#[derive(Parser, Debug)]
#[command(
    name = "filemorph",
    version,
    about = "Convert files between image, document, and ebook formats",
    long_about = "Classify a file by its content (never by its extension) and convert it \
to a chosen target format. Image work happens in-process; office documents and ebooks \
are delegated to LibreOffice and Calibre.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file path.
    input: PathBuf,

    /// Target subtype, e.g. png, webp, pdf, csv, mobi.
    #[arg(long = "to", value_name = "SUBTYPE", required_unless_present = "classify_only")]
    target: Option<String>,

    /// Target family (image, document, ebook). Inferred from --to when omitted.
    #[arg(long)]
    family: Option<String>,

    /// Write output to this path instead of deriving one from the input.
    #[arg(short, long, env = "FILEMORPH_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendered page width in pixels for PDF→image (16–8000).
    #[arg(long, env = "FILEMORPH_RENDER_WIDTH", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(16..=8000))]
    render_width: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "FILEMORPH_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// External tool deadline in seconds.
    #[arg(long, env = "FILEMORPH_TOOL_TIMEOUT", default_value_t = 120)]
    tool_timeout: u64,

    /// Path to the soffice binary.
    #[arg(long, env = "FILEMORPH_SOFFICE", default_value = "soffice")]
    soffice: String,

    /// Path to the ebook-convert binary.
    #[arg(long, env = "FILEMORPH_EBOOK_CONVERT", default_value = "ebook-convert")]
    ebook_convert: String,

    /// Classify the input and exit without converting.
    #[arg(long)]
    classify_only: bool,

    /// Print the result descriptor as JSON on stdout.
    #[arg(long, env = "FILEMORPH_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILEMORPH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILEMORPH_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let payload = std::fs::read(&cli.input)
        .with_context(|| format!("Failed to read '{}'", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();

    // ── Classify-only mode ───────────────────────────────────────────────
    if cli.classify_only {
        let descriptor = classify(&payload);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&descriptor).context("Failed to serialise descriptor")?
            );
        } else {
            println!("File:      {}", cli.input.display());
            println!("MIME type: {}", descriptor.mime_type);
            println!("Family:    {}", descriptor.family);
            println!("Subtype:   {}", descriptor.subtype);
        }
        return Ok(());
    }

    // `required_unless_present` guarantees the target is set here.
    let Some(target_subtype) = cli.target.clone() else {
        bail!("--to <SUBTYPE> is required unless --classify-only is given");
    };
    let target_subtype = target_subtype.to_ascii_lowercase();

    // ── Resolve the target family ────────────────────────────────────────
    let target_family = match &cli.family {
        Some(f) => f.clone(),
        None => match SUPPORTED_FILE_TYPES.get(target_subtype.as_str()) {
            Some(family) => family.as_str().to_string(),
            None => bail!(
                "Unknown target '{}'. Known targets: {}",
                target_subtype,
                SUPPORTED_FILE_TYPES
                    .keys()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    };

    let config = EngineConfig::builder()
        .render_width(cli.render_width)
        .jpeg_quality(cli.jpeg_quality)
        .tool_timeout_secs(cli.tool_timeout)
        .soffice_program(&cli.soffice)
        .ebook_convert_program(&cli.ebook_convert)
        .build()
        .context("Invalid configuration")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert(&filename, payload, &target_family, &target_subtype, &config)
        .await
        .context("Conversion failed")?;

    let output_path = match cli.output {
        Some(path) => path,
        None => derive_output_path(&cli.input, &target_subtype, &result.output),
    };
    std::fs::write(&output_path, &result.bytes)
        .with_context(|| format!("Failed to write '{}'", output_path.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    }
    if !cli.quiet {
        eprintln!(
            "{}  {}  {}  →  {}",
            green("✔"),
            bold(&output_path.display().to_string()),
            dim(&result.output.mime_type),
            dim(&format!("{} bytes", result.bytes.len())),
        );
    }

    let _ = io::stdout().flush();
    Ok(())
}

/// Derive an output path next to the input: `photo.png --to webp` writes
/// `photo.webp`, while zip-wrapped outputs get a `.zip` extension. The
/// re-classified descriptor is authoritative, never the requested target.
fn derive_output_path(
    input: &std::path::Path,
    target_subtype: &str,
    output: &FormatDescriptor,
) -> PathBuf {
    let ext = if output.mime_type == "application/zip" {
        "zip"
    } else {
        target_subtype
    };
    input.with_extension(ext)
}
