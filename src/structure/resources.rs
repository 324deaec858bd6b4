//! Page resource dictionaries.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::Result;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Resource sub-dictionary of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `/Font`
    Font,
    /// `/XObject`
    XObject,
    /// `/ExtGState`
    ExtGState,
    /// `/Pattern`
    Pattern,
    /// `/Shading`
    Shading,
    /// `/ColorSpace`
    ColorSpace,
    /// `/Properties`, e.g. optional content groups
    Properties,
}

impl ResourceKind {
    /// Key in the resource dictionary.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ResourceKind::Font => "Font",
            ResourceKind::XObject => "XObject",
            ResourceKind::ExtGState => "ExtGState",
            ResourceKind::Pattern => "Pattern",
            ResourceKind::Shading => "Shading",
            ResourceKind::ColorSpace => "ColorSpace",
            ResourceKind::Properties => "Properties",
        }
    }
}

/// Fills a reserved `/Resources` dictionary while the page is written.
///
/// Each kind gets its own sub-dictionary slot the first time it is used,
/// so entries of one kind stay together however they are interleaved.
pub struct ResourceFlow {
    root: FragmentWriter,
    kinds: IndexMap<ResourceKind, FragmentWriter>,
    names: HashSet<(ResourceKind, String)>,
}

impl ResourceFlow {
    /// Flow writing into `root`, a slot inside `<< >>`.
    pub fn new(root: FragmentWriter) -> Self {
        Self {
            root,
            kinds: IndexMap::new(),
            names: HashSet::new(),
        }
    }

    /// Whether `name` is already registered under `kind`.
    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.names.contains(&(kind, name.to_string()))
    }

    /// Register `name` → `obj` under `kind`.
    ///
    /// Returns `false` without writing anything if the name is already there.
    pub fn add(&mut self, kind: ResourceKind, name: &str, obj: ObjectRef) -> Result<bool> {
        if self.contains(kind, name) {
            return Ok(false);
        }
        let writer = match self.kinds.entry(kind) {
            indexmap::map::Entry::Occupied(entry) => entry.into_mut(),
            indexmap::map::Entry::Vacant(entry) => {
                self.root.write_name(kind.pdf_name())?;
                self.root.start_hash()?;
                let slot = self.root.fork()?;
                self.root.end_hash()?;
                entry.insert(slot)
            },
        };
        writer.write_name(name)?;
        writer.write_object_ref(obj)?;
        self.names.insert((kind, name.to_string()));
        Ok(true)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Close every sub-dictionary slot, then the root slot.
    pub fn close(&mut self) -> Result<()> {
        for (_, writer) in self.kinds.iter_mut() {
            if !writer.is_closed() {
                writer.close()?;
            }
        }
        self.root.close()
    }
}
