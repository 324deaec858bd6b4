//! Optional content groups (layers).
//!
//! Each layer is an `/OCG` object written when the layer is added. Pages
//! list the layers they use under `/Properties`, and content streams wrap
//! layered content in `/OC /name BDC ... EMC`. The catalog's
//! `/OCProperties` names every group and its initial visibility.

use crate::config::PdfVersion;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Handle to a layer returned by [`Layers::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layer {
    obj: ObjectRef,
    index: usize,
}

impl Layer {
    /// The `/OCG` object.
    pub fn object_ref(&self) -> ObjectRef {
        self.obj
    }

    /// Name under which pages list the layer in `/Properties`.
    pub fn resource_name(&self) -> String {
        format!("OC{}", self.index + 1)
    }
}

#[derive(Debug, Clone)]
struct LayerEntry {
    obj: ObjectRef,
    visible: bool,
}

/// The document's layers, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    entries: Vec<LayerEntry>,
}

impl Layers {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a new `/OCG` named `name`, initially shown when `visible`.
    pub fn add(&mut self, writer: &mut FragmentWriter, name: &str, visible: bool) -> Result<Layer> {
        writer
            .version()
            .require(PdfVersion::V1_5, "optional content groups")?;
        let obj = writer.next_ref();
        writer.start_object(obj)?;
        writer.start_hash()?;
        writer.write_name("Type")?;
        writer.write_name("OCG")?;
        writer.write_name("Name")?;
        writer.write_text(name)?;
        writer.end_hash()?;
        writer.end_object()?;

        let index = self.entries.len();
        self.entries.push(LayerEntry { obj, visible });
        log::trace!("layer '{}' as {}", name, obj);
        Ok(Layer { obj, index })
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no layers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `/OCProperties <<...>>` into the open catalog dictionary.
    ///
    /// Writes nothing when there are no layers.
    pub fn write_properties(&self, writer: &mut FragmentWriter) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let all: Vec<ObjectRef> = self.entries.iter().map(|e| e.obj).collect();
        let hidden: Vec<ObjectRef> = self
            .entries
            .iter()
            .filter(|e| !e.visible)
            .map(|e| e.obj)
            .collect();

        writer.write_name("OCProperties")?;
        writer.start_hash()?;
        writer.write_name("OCGs")?;
        write_refs(writer, &all)?;
        writer.write_name("D")?;
        writer.start_hash()?;
        writer.write_name("Order")?;
        write_refs(writer, &all)?;
        writer.write_name("BaseState")?;
        writer.write_name("ON")?;
        if !hidden.is_empty() {
            writer.write_name("OFF")?;
            write_refs(writer, &hidden)?;
        }
        writer.end_hash()?;
        writer.end_hash()
    }
}

fn write_refs(writer: &mut FragmentWriter, refs: &[ObjectRef]) -> Result<()> {
    writer.start_array()?;
    for obj in refs {
        writer.write_object_ref(*obj)?;
    }
    writer.end_array()
}
