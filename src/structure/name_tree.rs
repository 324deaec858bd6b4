//! Name trees (`Dests`, `EmbeddedFiles`).
//!
//! Entries are collected in a sorted map and written once, in ascending
//! byte order of their keys, so readers can binary-search the tree. The
//! tree is a single leaf: a flat root with `/Names` where the version
//! allows it, otherwise a root with one `/Kids` entry pointing at a leaf
//! carrying `/Limits`.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Sorted name tree with values of type `V`.
#[derive(Debug, Clone)]
pub struct NameTree<V> {
    entries: BTreeMap<Vec<u8>, V>,
}

impl<V> Default for NameTree<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> NameTree<V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, returning the value it replaces.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in the order they will be written.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(Vec::as_slice)
    }

    /// Write the tree as indirect objects and return the root.
    ///
    /// `write_value` writes one value token (a reference, an array...).
    /// Nothing is written for an empty tree.
    pub fn write<F>(&self, writer: &mut FragmentWriter, mut write_value: F) -> Result<Option<ObjectRef>>
    where
        F: FnMut(&mut FragmentWriter, &V) -> Result<()>,
    {
        let (first, last) = match (self.entries.keys().next(), self.entries.keys().next_back()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(None),
        };

        let root = writer.next_ref();
        let flat = writer.version().supports_flat_name_tree();
        let leaf = if flat {
            root
        } else {
            let leaf = writer.next_ref();
            writer.start_object(root)?;
            writer.start_hash()?;
            writer.write_name("Kids")?;
            writer.start_array()?;
            writer.write_object_ref(leaf)?;
            writer.end_array()?;
            writer.end_hash()?;
            writer.end_object()?;
            leaf
        };

        writer.start_object(leaf)?;
        writer.start_hash()?;
        if !flat {
            writer.write_name("Limits")?;
            writer.start_array()?;
            writer.write_bytes(first)?;
            writer.write_bytes(last)?;
            writer.end_array()?;
        }
        writer.write_name("Names")?;
        writer.start_array()?;
        for (key, value) in &self.entries {
            writer.write_bytes(key)?;
            write_value(writer, value)?;
        }
        writer.end_array()?;
        writer.end_hash()?;
        writer.end_object()?;

        log::debug!("name tree {}: {} entries", root, self.entries.len());
        Ok(Some(root))
    }
}
