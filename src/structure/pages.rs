//! Page tree and page objects.
//!
//! The `/Pages` node is written before any page exists. Its `/Kids` array
//! and `/Count` value are reserved slots: each new page appends its
//! reference to the first, and the final page count goes into the second
//! when the tree is closed.

use crate::config::PdfVersion;
use crate::error::{Error, Result};
use crate::object::ObjectRef;
use crate::structure::ResourceFlow;
use crate::writer::FragmentWriter;

/// Smallest allowed page side in default user space units.
pub const MIN_PAGE_SIZE: f32 = 3.0;

/// Largest allowed page side in default user space units.
pub const MAX_PAGE_SIZE: f32 = 14400.0;

/// A rectangle `[llx lly urx ury]` in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x
    pub llx: f32,
    /// Lower-left y
    pub lly: f32,
    /// Upper-right x
    pub urx: f32,
    /// Upper-right y
    pub ury: f32,
}

impl PageBox {
    /// Box from corner coordinates.
    pub fn new(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self { llx, lly, urx, ury }
    }

    fn as_rect(&self) -> [f64; 4] {
        [self.llx as f64, self.lly as f64, self.urx as f64, self.ury as f64]
    }
}

/// Geometry of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    /// Media box width
    pub width: f32,
    /// Media box height
    pub height: f32,
    /// Visible region
    pub crop_box: Option<PageBox>,
    /// Clipping region for production output (PDF 1.3)
    pub bleed_box: Option<PageBox>,
    /// Finished page after trimming (PDF 1.3)
    pub trim_box: Option<PageBox>,
    /// Meaningful content region (PDF 1.3)
    pub art_box: Option<PageBox>,
    /// Clockwise rotation in degrees, a multiple of 90
    pub rotate: i32,
    /// Size of a user space unit in points (PDF 1.6)
    pub user_unit: Option<f32>,
}

impl PageSetup {
    /// Page of `width` x `height` points.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            crop_box: None,
            bleed_box: None,
            trim_box: None,
            art_box: None,
            rotate: 0,
            user_unit: None,
        }
    }

    /// US Letter (612 x 792).
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// ISO A4 (595 x 842).
    pub fn a4() -> Self {
        Self::new(595.0, 842.0)
    }

    /// Set the crop box.
    pub fn with_crop_box(mut self, crop: PageBox) -> Self {
        self.crop_box = Some(crop);
        self
    }

    /// Set the bleed box.
    pub fn with_bleed_box(mut self, bleed: PageBox) -> Self {
        self.bleed_box = Some(bleed);
        self
    }

    /// Set the trim box.
    pub fn with_trim_box(mut self, trim: PageBox) -> Self {
        self.trim_box = Some(trim);
        self
    }

    /// Set the art box.
    pub fn with_art_box(mut self, art: PageBox) -> Self {
        self.art_box = Some(art);
        self
    }

    /// Set the rotation.
    pub fn with_rotate(mut self, degrees: i32) -> Self {
        self.rotate = degrees;
        self
    }

    /// Set the user unit.
    pub fn with_user_unit(mut self, unit: f32) -> Self {
        self.user_unit = Some(unit);
        self
    }

    /// Check the setup against the size limits and `version`.
    pub fn validate(&self, version: PdfVersion) -> Result<()> {
        let in_range = |side: f32| (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&side);
        if !in_range(self.width) || !in_range(self.height) {
            return Err(Error::InvalidPageSize {
                width: self.width,
                height: self.height,
                min: MIN_PAGE_SIZE,
                max: MAX_PAGE_SIZE,
            });
        }
        if self.rotate % 90 != 0 {
            return Err(Error::InvalidArgument(format!(
                "page rotation must be a multiple of 90, got {}",
                self.rotate
            )));
        }
        if self.bleed_box.is_some() {
            version.require(PdfVersion::V1_3, "BleedBox")?;
        }
        if self.trim_box.is_some() {
            version.require(PdfVersion::V1_3, "TrimBox")?;
        }
        if self.art_box.is_some() {
            version.require(PdfVersion::V1_3, "ArtBox")?;
        }
        if let Some(unit) = self.user_unit {
            version.require(PdfVersion::V1_6, "UserUnit")?;
            if !(unit.is_finite() && unit > 0.0) {
                return Err(Error::InvalidArgument(format!("invalid user unit {}", unit)));
            }
        }
        Ok(())
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::letter()
    }
}

/// The document's single `/Pages` node.
pub struct PageTree {
    obj: ObjectRef,
    kids: FragmentWriter,
    count: FragmentWriter,
    pages: usize,
}

impl PageTree {
    /// Write the `/Pages` object `obj` with reserved `/Kids` and `/Count`.
    pub fn new(writer: &mut FragmentWriter, obj: ObjectRef) -> Result<Self> {
        writer.start_object(obj)?;
        writer.start_hash()?;
        writer.write_name("Type")?;
        writer.write_name("Pages")?;
        writer.write_name("Kids")?;
        writer.start_array()?;
        let kids = writer.fork()?;
        writer.end_array()?;
        writer.write_name("Count")?;
        let count = writer.fork()?;
        writer.end_hash()?;
        writer.end_object()?;
        Ok(Self {
            obj,
            kids,
            count,
            pages: 0,
        })
    }

    /// Reference of the `/Pages` object.
    pub fn object_ref(&self) -> ObjectRef {
        self.obj
    }

    /// Number of pages added so far.
    pub fn len(&self) -> usize {
        self.pages
    }

    /// Whether no page has been added.
    pub fn is_empty(&self) -> bool {
        self.pages == 0
    }

    /// Add `page` to `/Kids`.
    pub fn add_kid(&mut self, page: ObjectRef) -> Result<()> {
        self.kids.write_object_ref(page)?;
        self.pages += 1;
        Ok(())
    }

    /// Write page object `page` into `writer` and register it.
    ///
    /// `setup` must already have passed [`PageSetup::validate`] for the
    /// writer's version. The page's `/Resources` dictionary is left open as
    /// the returned flow; it must be closed before `writer` is.
    pub fn write_page(
        &mut self,
        writer: &mut FragmentWriter,
        page: ObjectRef,
        setup: &PageSetup,
        contents: ObjectRef,
    ) -> Result<ResourceFlow> {
        debug_assert!(setup.validate(writer.version()).is_ok());
        writer.start_object(page)?;
        writer.start_hash()?;
        writer.write_name("Type")?;
        writer.write_name("Page")?;
        writer.write_name("Parent")?;
        writer.write_object_ref(self.obj)?;
        writer.write_name("MediaBox")?;
        writer.write_rect([0.0, 0.0, setup.width as f64, setup.height as f64])?;
        let boxes = [
            ("CropBox", setup.crop_box),
            ("BleedBox", setup.bleed_box),
            ("TrimBox", setup.trim_box),
            ("ArtBox", setup.art_box),
        ];
        for (key, page_box) in boxes {
            if let Some(page_box) = page_box {
                writer.write_name(key)?;
                writer.write_rect(page_box.as_rect())?;
            }
        }
        if setup.rotate != 0 {
            writer.write_name("Rotate")?;
            writer.write_int(setup.rotate.rem_euclid(360) as i64)?;
        }
        if let Some(unit) = setup.user_unit {
            writer.write_name("UserUnit")?;
            writer.write_real(unit as f64)?;
        }
        writer.write_name("Resources")?;
        writer.start_hash()?;
        let resources = ResourceFlow::new(writer.fork()?);
        writer.end_hash()?;
        writer.write_name("Contents")?;
        writer.write_object_ref(contents)?;
        writer.end_hash()?;
        writer.end_object()?;

        self.add_kid(page)?;
        log::trace!("page {} ({} x {})", page, setup.width, setup.height);
        Ok(resources)
    }

    /// Fill `/Count` and release both slots.
    pub fn close(&mut self) -> Result<()> {
        self.kids.close()?;
        self.count.write_int(self.pages as i64)?;
        self.count.close()?;
        log::debug!("page tree {}: {} page(s)", self.obj, self.pages);
        Ok(())
    }
}
