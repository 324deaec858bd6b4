// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]

//! # PDF Spool
//!
//! Forward-only PDF assembly: documents are written front to back into any
//! `std::io::Write`, never held in memory as an object graph.
//!
//! ## Core Features
//!
//! - **Fragments**: the output is an ordered sequence of fragments. A writer
//!   can `fork()` a slot at its current position and fill it later, so page
//!   counts, `/Kids` arrays and stream lengths are written after the content
//!   they describe without seeking.
//! - **Streaming sink**: [`SpoolSink`] flushes each fragment as soon as
//!   every fragment before it is finished
//! - **Filters**: ASCIIHex, ASCII85 and Flate chains chosen from one table
//!   by stream mode and compression policy
//! - **Encryption**: standard security handler with RC4 (40/128-bit) and
//!   AES-128
//! - **Structure**: page tree, resources, fonts, images, outline, named
//!   destinations, embedded files, optional content and metadata
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_spool::{PdfDocument, WriterConfig};
//! use pdf_spool::structure::{PageSetup, StandardFont};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = PdfDocument::create("hello.pdf", WriterConfig::new())?;
//! let mut page = doc.create_page(PageSetup::letter())?;
//! let font = doc.use_font(&mut page, &StandardFont::Helvetica.into())?;
//! page.write_content(format!("BT /{} 24 Tf 72 700 Td (Hello) Tj ET", font).as_bytes())?;
//! page.finish()?;
//! doc.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Output plumbing
pub mod object;
pub mod sink;

// Stream filters
pub mod filters;

// Encryption support
pub mod encryption;

// Token writer, xref
pub mod writer;

// Page tree, resources, outline and friends
pub mod structure;

// Orchestration
pub mod document;

// Re-exports
pub use config::{Compression, DocumentInfo, PdfVersion, TextEncoding, WriterConfig};
pub use document::{Page, PdfDocument};
pub use encryption::{EncryptionAlgorithm, EncryptionConfig, Permissions};
pub use error::{Error, Result};
pub use filters::{Filter, StreamMode};
pub use object::ObjectRef;
pub use sink::{FragmentId, FragmentSink, PositionInfo, SpoolSink};
pub use writer::{FragmentWriter, WriterContext};
