//! Structural builders.
//!
//! Each builder assembles one PDF structure out of [`FragmentWriter`]
//! calls, reserving slots with `fork()` for values that are only known
//! later:
//!
//! - [`PageTree`]: the `/Pages` node, whose `/Kids` and `/Count` grow as
//!   pages are created
//! - [`ResourceFlow`]: a page's `/Resources`, one sub-dictionary per kind
//! - [`NameTree`]: sorted `Dests` and `EmbeddedFiles` trees
//! - [`Outline`]: the bookmark hierarchy
//! - [`FontTable`] and [`ImageTable`]: resources embedded once per source
//!
//! [`FragmentWriter`]: crate::writer::FragmentWriter

mod destination;
pub mod embedded_files;
pub mod fonts;
pub mod images;
pub mod layers;
pub mod metadata;
mod name_tree;
pub mod outline;
pub mod pages;
mod resources;

pub use destination::{Destination, FitMode, LinkTarget};
pub use embedded_files::{AFRelationship, EmbeddedFile};
pub use fonts::{Font, FontMetrics, FontTable, StandardFont, TrueTypeFont};
pub use images::{ColorSpace, ImageData, ImageEncoding, ImageSource, ImageTable};
pub use layers::{Layer, Layers};
pub use name_tree::NameTree;
pub use outline::{BookmarkId, Outline, OutlineStyle};
pub use pages::{PageBox, PageSetup, PageTree, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use resources::{ResourceFlow, ResourceKind};
