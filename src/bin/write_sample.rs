//! Write a sample document
//!
//! Produces a small PDF exercising pages, fonts, an outline, a named
//! destination, a layer and an attachment.
//!
//! Usage:
//!   cargo run --bin write_sample -- out.pdf
//!   cargo run --bin write_sample -- out.pdf --pages 5 --compression ascii

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use pdf_spool::structure::{
    Destination, EmbeddedFile, FitMode, LinkTarget, OutlineStyle, PageSetup, StandardFont,
};
use pdf_spool::{Compression, DocumentInfo, PdfDocument, Result, WriterConfig};

struct SampleConfig {
    output: PathBuf,
    pages: usize,
    compression: Compression,
}

impl SampleConfig {
    fn from_args() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut output = None;
        let mut pages = 3;
        let mut compression = Compression::Binary;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--pages" => {
                    i += 1;
                    pages = args.get(i)?.parse().ok()?;
                },
                "--compression" => {
                    i += 1;
                    compression = match args.get(i)?.as_str() {
                        "none" => Compression::None,
                        "ascii" => Compression::Ascii,
                        "binary" => Compression::Binary,
                        _ => return None,
                    };
                },
                path => output = Some(PathBuf::from(path)),
            }
            i += 1;
        }

        Some(Self {
            output: output?,
            pages,
            compression,
        })
    }
}

fn write_sample(config: &SampleConfig) -> Result<()> {
    let info = DocumentInfo::new()
        .title("pdf_spool sample")
        .author("write_sample")
        .subject("Forward-only PDF assembly");
    let writer_config = WriterConfig::new()
        .with_compression(config.compression)
        .with_info(info)
        .with_xmp_metadata(true);
    let mut doc = PdfDocument::create(&config.output, writer_config)?;

    let grid = doc.add_layer("Grid", true)?;
    doc.start_bookmark("Pages", None)?;
    for n in 1..=config.pages {
        let mut page = doc.create_page(PageSetup::a4())?;
        let dest = Destination::new(page.object_ref(), FitMode::Fit);
        let font = doc.use_font(&mut page, &StandardFont::HelveticaBold.into())?;
        let layer = doc.use_layer(&mut page, &grid)?;

        page.write_content(
            format!(
                "BT /{} 28 Tf 72 760 Td (Page {} of {}) Tj ET\n",
                font, n, config.pages
            )
            .as_bytes(),
        )?;
        page.write_content(format!("/OC /{} BDC\n0.8 g\n", layer).as_bytes())?;
        for row in 0..8 {
            let y = 100 + row * 80;
            page.write_content(format!("72 {} 451 2 re f\n", y).as_bytes())?;
        }
        page.write_content(b"EMC\n")?;

        let id = doc.start_bookmark(&format!("Page {}", n), Some(LinkTarget::from(dest)))?;
        if n == 1 {
            doc.outline_mut().set_style(id, OutlineStyle::new().bold())?;
            doc.add_named_destination("first", dest)?;
        }
        doc.end_bookmark()?;
        page.finish()?;
    }
    doc.end_bookmark()?;
    doc.start_bookmark("Back to the start", Some(LinkTarget::Named("first".to_string())))?;
    doc.end_bookmark()?;

    doc.attach_file(
        EmbeddedFile::new("README.txt", b"Written by pdf_spool.\n".to_vec())
            .with_mime_type("text/plain")
            .with_description("About this file"),
    )?;
    doc.close()
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(config) = SampleConfig::from_args() else {
        eprintln!("usage: write_sample OUTPUT [--pages N] [--compression none|ascii|binary]");
        return ExitCode::FAILURE;
    };

    let start = Instant::now();
    match write_sample(&config) {
        Ok(()) => {
            println!(
                "wrote {} ({} pages) in {:.1?}",
                config.output.display(),
                config.pages,
                start.elapsed()
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        },
    }
}
