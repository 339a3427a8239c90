//! Integration tests for the conversion engine.
//!
//! Everything runs on in-memory fixtures (generated images, a hand-built
//! minimal XLSX). Tests that need the pdfium shared library skip
//! themselves when it is not installed; tests that shell out to
//! LibreOffice or Calibre are additionally gated behind `TOOL_E2E=1` so
//! CI does not depend on those programs.
//!
//! Run everything:
//!   TOOL_E2E=1 cargo test --test engine -- --nocapture

use std::io::{Cursor, Read, Write};

use filemorph::{classify, convert, ConvertError, EngineConfig, Family};
use image::{DynamicImage, Rgba, RgbaImage};
use pdfium_render::prelude::*;

// ── Test helpers ─────────────────────────────────────────────────────────

/// Skip the current test with a visible reason.
macro_rules! skip_unless {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            println!("SKIP — {}", $msg);
            return;
        }
    };
}

fn pdfium_available() -> bool {
    Pdfium::bind_to_system_library().is_ok()
}

fn tool_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .is_ok()
}

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([30, 144, 255, 255]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}

/// A minimal two-sheet XLSX workbook with inline strings, built by hand.
/// Sheet "Alpha" holds a header row plus one data row; sheet "Beta"
/// holds a single row.
fn xlsx_fixture() -> Vec<u8> {
    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Alpha" sheetId="1" r:id="rId1"/>
<sheet name="Beta" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c><c r="B1" t="inlineStr"><is><t>qty</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>apple</t></is></c><c r="B2"><v>3</v></c></row>
</sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>beta-only</t></is></c></row>
</sheetData>
</worksheet>"#;

    let mut buf = Vec::new();
    {
        let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ] {
            w.start_file(name, options).unwrap();
            w.write_all(content.as_bytes()).unwrap();
        }
        w.finish().unwrap();
    }
    buf
}

/// A minimal one-paragraph DOCX LibreOffice will open.
fn docx_fixture() -> Vec<u8> {
    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body><w:p><w:r><w:t>A single paragraph.</w:t></w:r></w:p></w:body>
</w:document>"#;

    let mut buf = Vec::new();
    {
        let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("word/document.xml", DOCUMENT),
        ] {
            w.start_file(name, options).unwrap();
            w.write_all(content.as_bytes()).unwrap();
        }
        w.finish().unwrap();
    }
    buf
}

/// Smallest EPUB Calibre will accept: stored `mimetype` first, then the
/// container pointer, package document, and one XHTML chapter.
fn epub_fixture() -> Vec<u8> {
    const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
<rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>Fixture</dc:title>
<dc:language>en</dc:language>
<dc:identifier id="uid">urn:uuid:00000000-0000-0000-0000-000000000001</dc:identifier>
</metadata>
<manifest><item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/></manifest>
<spine><itemref idref="ch1"/></spine>
</package>"#;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><p>A single paragraph.</p></body></html>"#;

    let mut buf = Vec::new();
    {
        let mut w = zip::ZipWriter::new(Cursor::new(&mut buf));
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        w.start_file("mimetype", stored).unwrap();
        w.write_all(b"application/epub+zip").unwrap();

        let deflated = zip::write::SimpleFileOptions::default();
        for (name, content) in [
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/chapter1.xhtml", CHAPTER),
        ] {
            w.start_file(name, deflated).unwrap();
            w.write_all(content.as_bytes()).unwrap();
        }
        w.finish().unwrap();
    }
    buf
}

/// A blank multi-page PDF generated through pdfium. `None` when the
/// shared library is unavailable.
fn blank_pdf(pages: usize) -> Option<Vec<u8>> {
    let pdfium = Pdfium::new(Pdfium::bind_to_system_library().ok()?);
    let mut document = pdfium.create_new_pdf().ok()?;
    for _ in 0..pages {
        document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .ok()?;
    }
    document.save_to_bytes().ok()
}

// ── Classification ───────────────────────────────────────────────────────

#[test]
fn classification_covers_the_fixture_formats() {
    assert_eq!(classify(&png_fixture(4, 4)).mime_type, "image/png");
    assert_eq!(
        classify(&xlsx_fixture()).mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        classify(&docx_fixture()).mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );

    let epub = classify(&epub_fixture());
    assert_eq!(epub.mime_type, "application/epub+zip");
    assert_eq!(epub.family, Family::Ebook);
}

// ── In-process conversions ───────────────────────────────────────────────

#[tokio::test]
async fn png_to_webp_produces_bare_webp() {
    let result = convert(
        "square.png",
        png_fixture(16, 16),
        "image",
        "webp",
        &EngineConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.output.mime_type, "image/webp");
    assert!(result.bytes.starts_with(b"RIFF"));
}

#[tokio::test]
async fn jpeg_round_trips_back_to_png() {
    let config = EngineConfig::default();
    let jpeg = convert("square.png", png_fixture(20, 10), "image", "jpeg", &config)
        .await
        .unwrap();
    assert_eq!(jpeg.output.mime_type, "image/jpeg");

    let png = convert("square.jpeg", jpeg.bytes, "image", "png", &config)
        .await
        .unwrap();
    assert_eq!(png.output.mime_type, "image/png");

    let img = image::load_from_memory(&png.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (20, 10));
}

#[tokio::test]
async fn xlsx_to_csv_yields_one_entry_per_sheet() {
    let result = convert(
        "book.xlsx",
        xlsx_fixture(),
        "document",
        "csv",
        &EngineConfig::default(),
    )
    .await
    .unwrap();

    // Document outputs are zip-wrapped, and the wrapper sniffs as zip.
    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(
        zip_entry_names(&result.bytes),
        vec!["book_1.csv", "book_2.csv"]
    );

    let alpha = String::from_utf8(zip_entry(&result.bytes, "book_1.csv")).unwrap();
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(alpha.as_bytes())
        .into_records();
    let header = rows.next().unwrap().unwrap();
    assert_eq!(&header[0], "name");
    assert_eq!(&header[1], "qty");
    let data = rows.next().unwrap().unwrap();
    assert_eq!(&data[0], "apple");
    assert_eq!(&data[1], "3");

    let beta = String::from_utf8(zip_entry(&result.bytes, "book_2.csv")).unwrap();
    assert!(beta.contains("beta-only"));
}

// ── Capability validation ────────────────────────────────────────────────

#[tokio::test]
async fn image_cannot_become_an_ebook() {
    let err = convert(
        "square.png",
        png_fixture(4, 4),
        "ebook",
        "epub",
        &EngineConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedTargetType { .. }));
}

#[tokio::test]
async fn epub_rejects_pdf_inside_the_ebook_family() {
    // PDF is offered under Document, not under Ebook; asking for the
    // wrong family/subtype pairing must name the subtype as the problem.
    let err = convert(
        "novel.epub",
        epub_fixture(),
        "ebook",
        "pdf",
        &EngineConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::UnsupportedTargetSubtype { .. }
    ));
}

#[tokio::test]
async fn avif_input_has_no_source_converter() {
    // A valid-looking AVIF header classifies as image/avif, but no
    // converter fronts it; the rejection must name the subtype.
    let payload = b"\x00\x00\x00\x1cftypavif\x00\x00\x00\x00avifmif1".to_vec();
    let err = convert("photo.avif", payload, "image", "png", &EngineConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnrecognizedSubtype { .. }));
}

#[tokio::test]
async fn unclassifiable_bytes_are_rejected_with_subtype_error() {
    let err = convert(
        "mystery.bin",
        vec![0x00, 0xFF, 0x13, 0x37],
        "image",
        "png",
        &EngineConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ConvertError::UnrecognizedSubtype { .. }));
}

// ── pdfium-dependent conversions ─────────────────────────────────────────

#[tokio::test]
async fn three_page_pdf_fans_out_to_numbered_pngs() {
    skip_unless!(pdfium_available(), "pdfium shared library not found");
    let Some(pdf) = blank_pdf(3) else {
        println!("SKIP — could not generate fixture PDF");
        return;
    };

    let result = convert("doc.pdf", pdf, "image", "png", &EngineConfig::default())
        .await
        .unwrap();

    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(
        zip_entry_names(&result.bytes),
        vec!["doc_1.png", "doc_2.png", "doc_3.png"]
    );
    for name in ["doc_1.png", "doc_2.png", "doc_3.png"] {
        let page = zip_entry(&result.bytes, name);
        let img = image::load_from_memory(&page).unwrap();
        assert!(img.width() > 0 && img.height() > 0);
    }
}

#[tokio::test]
async fn png_to_pdf_returns_a_raw_pdf() {
    skip_unless!(pdfium_available(), "pdfium shared library not found");

    let result = convert(
        "square.png",
        png_fixture(32, 24),
        "document",
        "pdf",
        &EngineConfig::default(),
    )
    .await
    .unwrap();

    // A one-page PDF is a single unit: no archive wrapping, and the
    // output classifies as the PDF itself.
    assert_eq!(result.output.mime_type, "application/pdf");
    assert!(result.bytes.starts_with(b"%PDF"));
}

// ── External-tool conversions (TOOL_E2E gated) ───────────────────────────

#[tokio::test]
async fn csv_to_xlsx_via_soffice() {
    skip_unless!(
        std::env::var("TOOL_E2E").is_ok(),
        "set TOOL_E2E=1 to run external-tool tests"
    );
    skip_unless!(tool_available("soffice"), "soffice not installed");

    let payload = b"name,qty\napple,3\npear,5\n".to_vec();
    let result = convert("data.csv", payload, "document", "xlsx", &EngineConfig::default())
        .await
        .unwrap();

    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(zip_entry_names(&result.bytes), vec!["data.xlsx"]);
    // The inner file must itself classify as a spreadsheet.
    let inner = zip_entry(&result.bytes, "data.xlsx");
    assert_eq!(
        classify(&inner).mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[tokio::test]
async fn docx_to_pdf_via_soffice() {
    skip_unless!(
        std::env::var("TOOL_E2E").is_ok(),
        "set TOOL_E2E=1 to run external-tool tests"
    );
    skip_unless!(tool_available("soffice"), "soffice not installed");

    let result = convert(
        "letter.docx",
        docx_fixture(),
        "document",
        "pdf",
        &EngineConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(zip_entry_names(&result.bytes), vec!["letter.pdf"]);
    assert!(zip_entry(&result.bytes, "letter.pdf").starts_with(b"%PDF"));
}

#[tokio::test]
async fn pdf_to_docx_via_soffice() {
    skip_unless!(
        std::env::var("TOOL_E2E").is_ok(),
        "set TOOL_E2E=1 to run external-tool tests"
    );
    skip_unless!(tool_available("soffice"), "soffice not installed");
    skip_unless!(pdfium_available(), "pdfium shared library not found");
    let Some(pdf) = blank_pdf(1) else {
        println!("SKIP — could not generate fixture PDF");
        return;
    };

    let result = convert("doc.pdf", pdf, "document", "docx", &EngineConfig::default())
        .await
        .unwrap();

    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(zip_entry_names(&result.bytes), vec!["doc.docx"]);
    let inner = zip_entry(&result.bytes, "doc.docx");
    assert_eq!(
        classify(&inner).mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
}

#[tokio::test]
async fn epub_to_mobi_via_ebook_convert() {
    skip_unless!(
        std::env::var("TOOL_E2E").is_ok(),
        "set TOOL_E2E=1 to run external-tool tests"
    );
    skip_unless!(tool_available("ebook-convert"), "ebook-convert not installed");

    let result = convert(
        "novel.epub",
        epub_fixture(),
        "ebook",
        "mobi",
        &EngineConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.output.mime_type, "application/zip");
    assert_eq!(zip_entry_names(&result.bytes), vec!["novel.mobi"]);
    let inner = zip_entry(&result.bytes, "novel.mobi");
    assert_eq!(classify(&inner).mime_type, "application/x-mobipocket-ebook");
}
