//! Explicit destinations and link targets.

use crate::error::Result;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Page fit mode for destinations.
///
/// `None` coordinates are written as `null` and leave the viewer's current
/// value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum FitMode {
    /// Fit the entire page in the window (default)
    #[default]
    Fit,
    /// Fit the page width, with top at specified position
    FitH(Option<f64>),
    /// Fit the page height, with left at specified position
    FitV(Option<f64>),
    /// Fit a specific rectangle
    FitR {
        /// Left coordinate
        left: f64,
        /// Bottom coordinate
        bottom: f64,
        /// Right coordinate
        right: f64,
        /// Top coordinate
        top: f64,
    },
    /// Fit the bounding box of the page contents
    FitB,
    /// Fit bounding box width
    FitBH(Option<f64>),
    /// Fit bounding box height
    FitBV(Option<f64>),
    /// Display at specific position with zoom
    XYZ {
        /// Left coordinate
        left: Option<f64>,
        /// Top coordinate
        top: Option<f64>,
        /// Zoom factor (0 keeps the current zoom)
        zoom: Option<f64>,
    },
}

/// A page plus the view to show it with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    /// Target page object
    pub page: ObjectRef,
    /// View
    pub fit: FitMode,
}

impl Destination {
    /// Show `page` with `fit`.
    pub fn new(page: ObjectRef, fit: FitMode) -> Self {
        Self { page, fit }
    }

    /// Show the whole of `page`.
    pub fn page(page: ObjectRef) -> Self {
        Self::new(page, FitMode::Fit)
    }

    /// Write the destination array, e.g. `[4 0 R /XYZ 0 792 null]`.
    pub fn write(&self, writer: &mut FragmentWriter) -> Result<()> {
        writer.start_array()?;
        writer.write_object_ref(self.page)?;
        match self.fit {
            FitMode::Fit => writer.write_name("Fit")?,
            FitMode::FitB => writer.write_name("FitB")?,
            FitMode::FitH(top) => {
                writer.write_name("FitH")?;
                write_optional(writer, top)?;
            },
            FitMode::FitV(left) => {
                writer.write_name("FitV")?;
                write_optional(writer, left)?;
            },
            FitMode::FitBH(top) => {
                writer.write_name("FitBH")?;
                write_optional(writer, top)?;
            },
            FitMode::FitBV(left) => {
                writer.write_name("FitBV")?;
                write_optional(writer, left)?;
            },
            FitMode::FitR {
                left,
                bottom,
                right,
                top,
            } => {
                writer.write_name("FitR")?;
                for value in [left, bottom, right, top] {
                    writer.write_real(value)?;
                }
            },
            FitMode::XYZ { left, top, zoom } => {
                writer.write_name("XYZ")?;
                write_optional(writer, left)?;
                write_optional(writer, top)?;
                write_optional(writer, zoom)?;
            },
        }
        writer.end_array()
    }
}

fn write_optional(writer: &mut FragmentWriter, value: Option<f64>) -> Result<()> {
    match value {
        Some(value) => writer.write_real(value),
        None => writer.write_null(),
    }
}

/// Where a bookmark leads.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Explicit destination in this document
    Destination(Destination),
    /// Entry of the `Dests` name tree
    Named(String),
    /// External URI
    Uri(String),
}

impl LinkTarget {
    /// Write `/Dest ...` or `/A <<...>>` into the open dictionary.
    pub(crate) fn write_entry(&self, writer: &mut FragmentWriter) -> Result<()> {
        match self {
            LinkTarget::Destination(dest) => {
                writer.write_name("Dest")?;
                dest.write(writer)
            },
            LinkTarget::Named(name) => {
                writer.write_name("Dest")?;
                writer.write_bytes(name.as_bytes())
            },
            LinkTarget::Uri(uri) => {
                writer.write_name("A")?;
                writer.start_hash()?;
                writer.write_name("S")?;
                writer.write_name("URI")?;
                writer.write_name("URI")?;
                writer.write_bytes(uri.as_bytes())?;
                writer.end_hash()
            },
        }
    }
}

impl From<Destination> for LinkTarget {
    fn from(dest: Destination) -> Self {
        LinkTarget::Destination(dest)
    }
}
