//! Document outline (bookmarks).
//!
//! Bookmarks are nested with [`Outline::start_bookmark`] and
//! [`Outline::end_bookmark`] while pages are produced and written in one go
//! when the document closes. Nodes live in a flat arena linked by index.
//! Before writing, nodes that have neither a title nor children are spliced
//! out, then every survivor gets an object number in document order.

use crate::error::{Error, Result};
use crate::object::ObjectRef;
use crate::structure::LinkTarget;
use crate::writer::FragmentWriter;

/// Text style for outline items.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutlineStyle {
    /// Display in italic
    pub italic: bool,
    /// Display in bold
    pub bold: bool,
    /// Text color (RGB, 0.0-1.0)
    pub color: Option<(f64, f64, f64)>,
}

impl OutlineStyle {
    /// Create a new default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bold style.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Set italic style.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Set text color.
    pub fn color(mut self, r: f64, g: f64, b: f64) -> Self {
        self.color = Some((r, g, b));
        self
    }

    /// Value of the `/F` entry.
    pub fn flags(&self) -> i64 {
        let mut flags = 0i64;
        if self.italic {
            flags |= 1;
        }
        if self.bold {
            flags |= 2;
        }
        flags
    }
}

/// Handle to a bookmark returned by [`Outline::start_bookmark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookmarkId(usize);

#[derive(Debug, Clone, Default)]
struct Node {
    title: Option<String>,
    target: Option<LinkTarget>,
    style: OutlineStyle,
    open: bool,
    parent: Option<usize>,
    prev: Option<usize>,
    next: Option<usize>,
    first: Option<usize>,
    last: Option<usize>,
    obj: Option<ObjectRef>,
}

const ROOT: usize = 0;

/// Bookmark hierarchy under construction.
#[derive(Debug, Clone)]
pub struct Outline {
    nodes: Vec<Node>,
    cursor: usize,
}

impl Default for Outline {
    fn default() -> Self {
        Self::new()
    }
}

impl Outline {
    /// Empty outline; new bookmarks go to the top level.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                open: true,
                ..Node::default()
            }],
            cursor: ROOT,
        }
    }

    /// Open a bookmark under the current one and make it current.
    ///
    /// A bookmark without a title is dropped when the outline is written
    /// unless it ends up with children.
    pub fn start_bookmark(
        &mut self,
        title: Option<String>,
        target: Option<LinkTarget>,
    ) -> BookmarkId {
        let index = self.nodes.len();
        let parent = self.cursor;
        self.nodes.push(Node {
            title,
            target,
            open: true,
            parent: Some(parent),
            ..Node::default()
        });
        self.link_last(parent, index);
        self.cursor = index;
        log::trace!("bookmark {} opened under {}", index, parent);
        BookmarkId(index)
    }

    /// Close the current bookmark; its parent becomes current.
    pub fn end_bookmark(&mut self) -> Result<()> {
        match self.nodes[self.cursor].parent {
            Some(parent) => {
                self.cursor = parent;
                Ok(())
            },
            None => Err(Error::illegal("end_bookmark without an open bookmark")),
        }
    }

    /// Nesting depth of the current bookmark (0 at the top level).
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.cursor;
        while let Some(parent) = self.nodes[node].parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// Set the display style of a bookmark.
    pub fn set_style(&mut self, id: BookmarkId, style: OutlineStyle) -> Result<()> {
        self.node_mut(id)?.style = style;
        Ok(())
    }

    /// Show a bookmark's children collapsed (`false`) or expanded.
    pub fn set_open(&mut self, id: BookmarkId, open: bool) -> Result<()> {
        self.node_mut(id)?.open = open;
        Ok(())
    }

    /// Replace a bookmark's target.
    pub fn set_target(&mut self, id: BookmarkId, target: LinkTarget) -> Result<()> {
        self.node_mut(id)?.target = Some(target);
        Ok(())
    }

    /// Whether no bookmark has been started.
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].first.is_none()
    }

    fn node_mut(&mut self, id: BookmarkId) -> Result<&mut Node> {
        match self.nodes.get_mut(id.0) {
            Some(node) if id.0 != ROOT => Ok(node),
            _ => Err(Error::InvalidArgument(format!("unknown bookmark {}", id.0))),
        }
    }

    fn link_last(&mut self, parent: usize, child: usize) {
        match self.nodes[parent].last {
            Some(last) => {
                self.nodes[last].next = Some(child);
                self.nodes[child].prev = Some(last);
            },
            None => self.nodes[parent].first = Some(child),
        }
        self.nodes[parent].last = Some(child);
    }

    fn unlink(&mut self, index: usize) {
        let Node {
            parent, prev, next, ..
        } = self.nodes[index];
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent].first = next;
                }
            },
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent].last = prev;
                }
            },
        }
        let node = &mut self.nodes[index];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    fn children(&self, index: usize) -> Vec<usize> {
        let mut children = Vec::new();
        let mut child = self.nodes[index].first;
        while let Some(current) = child {
            children.push(current);
            child = self.nodes[current].next;
        }
        children
    }

    /// Splice out untitled leaves, deepest first.
    fn prune(&mut self, index: usize) {
        for child in self.children(index) {
            self.prune(child);
            let node = &self.nodes[child];
            if node.title.is_none() && node.first.is_none() {
                self.unlink(child);
            }
        }
    }

    /// Pre-order numbering of the surviving nodes.
    fn assign_refs(&mut self, index: usize, writer: &FragmentWriter) {
        self.nodes[index].obj = Some(writer.next_ref());
        for child in self.children(index) {
            self.assign_refs(child, writer);
        }
    }

    /// Visible descendants: children plus those of open children.
    fn visible_count(&self, index: usize) -> i64 {
        self.children(index)
            .into_iter()
            .map(|child| {
                1 + if self.nodes[child].open {
                    self.visible_count(child)
                } else {
                    0
                }
            })
            .sum()
    }

    fn obj(&self, index: Option<usize>) -> Option<ObjectRef> {
        index.and_then(|index| self.nodes[index].obj)
    }

    /// Write the outline and return the `/Outlines` root.
    ///
    /// Fails if a bookmark is still open. Returns `None` and writes nothing
    /// when no titled bookmark survives pruning.
    pub fn write(&mut self, writer: &mut FragmentWriter) -> Result<Option<ObjectRef>> {
        if self.cursor != ROOT {
            return Err(Error::illegal(format!(
                "outline written with {} bookmark(s) still open",
                self.depth()
            )));
        }
        self.prune(ROOT);
        if self.is_empty() {
            return Ok(None);
        }
        self.assign_refs(ROOT, writer);

        let mut written = 0usize;
        let mut pending = vec![ROOT];
        while let Some(index) = pending.pop() {
            self.write_node(writer, index)?;
            written += 1;
            let mut children = self.children(index);
            children.reverse();
            pending.extend(children);
        }
        log::debug!("outline: {} bookmark(s)", written - 1);
        Ok(self.nodes[ROOT].obj)
    }

    fn write_node(&self, writer: &mut FragmentWriter, index: usize) -> Result<()> {
        let node = &self.nodes[index];
        let obj = node
            .obj
            .ok_or_else(|| Error::illegal("outline node has no object number"))?;
        writer.start_object(obj)?;
        writer.start_hash()?;
        if index == ROOT {
            writer.write_name("Type")?;
            writer.write_name("Outlines")?;
        } else {
            writer.write_name("Title")?;
            writer.write_text(node.title.as_deref().unwrap_or(""))?;
            let links = [("Parent", node.parent), ("Prev", node.prev), ("Next", node.next)];
            for (key, link) in links {
                if let Some(link) = self.obj(link) {
                    writer.write_name(key)?;
                    writer.write_object_ref(link)?;
                }
            }
        }
        if let (Some(first), Some(last)) = (self.obj(node.first), self.obj(node.last)) {
            writer.write_name("First")?;
            writer.write_object_ref(first)?;
            writer.write_name("Last")?;
            writer.write_object_ref(last)?;
            let count = self.visible_count(index);
            writer.write_name("Count")?;
            writer.write_int(if node.open { count } else { -count })?;
        }
        if index != ROOT {
            if let Some(target) = &node.target {
                target.write_entry(writer)?;
            }
            if let Some((r, g, b)) = node.style.color {
                writer.write_name("C")?;
                writer.start_array()?;
                writer.write_real(r)?;
                writer.write_real(g)?;
                writer.write_real(b)?;
                writer.end_array()?;
            }
            let flags = node.style.flags();
            if flags != 0 {
                writer.write_name("F")?;
                writer.write_int(flags)?;
            }
        }
        writer.end_hash()?;
        writer.end_object()
    }
}
