//! Fragment sink: the ordered byte regions a document is assembled from.
//!
//! A document is the concatenation of its fragments in sink order. Writers
//! may insert a new fragment in front of any fragment that has not started
//! reaching the output yet, which is what lets a value be written "earlier"
//! in the file than the code that produced it ran.
//!
//! [`SpoolSink`] streams the first unfinished fragment straight to the
//! underlying writer. Every later fragment is held in memory only until all
//! fragments before it are closed, then flushed and freed, so peak memory is
//! bounded by the span of open reservations rather than the document size.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::error::{Error, Result};

/// Identifier of a fragment within one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(usize);

impl FragmentId {
    /// Raw index, stable for the sink's lifetime.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Final absolute offsets of fragments.
#[derive(Debug, Clone, Default)]
pub struct PositionInfo {
    bases: HashMap<FragmentId, u64>,
    length: u64,
}

impl PositionInfo {
    /// Absolute offset of the first byte of `fragment`.
    pub fn base_offset(&self, fragment: FragmentId) -> Option<u64> {
        self.bases.get(&fragment).copied()
    }

    /// Number of bytes emitted when the snapshot was taken.
    pub fn length(&self) -> u64 {
        self.length
    }
}

/// An ordered, mutable sequence of fragments.
pub trait FragmentSink {
    /// Create a fragment at the end of the sequence.
    fn append_fragment(&mut self) -> Result<FragmentId>;

    /// Create a fragment immediately before `anchor`.
    fn insert_fragment_before(&mut self, anchor: FragmentId) -> Result<FragmentId>;

    /// Append bytes to an open fragment.
    fn write(&mut self, fragment: FragmentId, data: &[u8]) -> Result<()>;

    /// Mark a fragment complete. No further bytes may be written to it.
    fn close_fragment(&mut self, fragment: FragmentId) -> Result<()>;

    /// Snapshot the absolute offsets of every emitted fragment.
    fn position_info(&self) -> Result<PositionInfo>;

    /// Flush the underlying output. Every fragment must be closed.
    fn finish(&mut self) -> Result<()>;
}

/// Shared handle to the document's sink.
pub type SharedSink = Rc<RefCell<dyn FragmentSink>>;

/// Byte-sink view of one fragment.
pub struct FragmentOutput {
    sink: SharedSink,
    fragment: FragmentId,
}

impl FragmentOutput {
    /// Open `fragment` for writing.
    pub fn open(sink: SharedSink, fragment: FragmentId) -> Self {
        Self { sink, fragment }
    }

    /// The fragment this output writes to.
    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }
}

impl Write for FragmentOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink
            .borrow_mut()
            .write(self.fragment, buf)
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Fragment {
    prev: Option<usize>,
    next: Option<usize>,
    buffer: Vec<u8>,
    closed: bool,
    /// Set once the fragment starts streaming to the output.
    base: Option<u64>,
}

/// [`FragmentSink`] that streams to any [`Write`].
pub struct SpoolSink<W: Write> {
    out: Option<W>,
    fragments: Vec<Fragment>,
    /// First fragment not yet fully emitted.
    head: Option<usize>,
    last: Option<usize>,
    written: u64,
    buffered: usize,
    peak_buffered: usize,
}

impl<W: Write> SpoolSink<W> {
    /// Create a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Some(out),
            fragments: Vec::new(),
            head: None,
            last: None,
            written: 0,
            buffered: 0,
            peak_buffered: 0,
        }
    }

    /// Bytes emitted to the output so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Largest number of bytes held back at any one time.
    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    /// Take the output back. Subsequent writes fail.
    pub fn take_output(&mut self) -> Option<W> {
        self.out.take()
    }

    fn fragment_mut(&mut self, id: FragmentId) -> Result<&mut Fragment> {
        self.fragments
            .get_mut(id.0)
            .ok_or_else(|| Error::illegal(format!("unknown fragment {}", id.0)))
    }

    fn emit(&mut self, data: &[u8]) -> Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::illegal("sink output already taken"))?;
        out.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Promote `index` to head: record its base and emit what it buffered.
    fn promote(&mut self, index: usize) -> Result<()> {
        self.head = Some(index);
        let pending = std::mem::take(&mut self.fragments[index].buffer);
        self.fragments[index].base = Some(self.written);
        self.buffered -= pending.len();
        self.emit(&pending)
    }

    /// Emit every closed fragment at the head of the sequence.
    fn advance(&mut self) -> Result<()> {
        while let Some(head) = self.head {
            if !self.fragments[head].closed {
                break;
            }
            match self.fragments[head].next {
                Some(next) => self.promote(next)?,
                None => self.head = None,
            }
        }
        Ok(())
    }

    fn push(&mut self, prev: Option<usize>, next: Option<usize>) -> usize {
        let index = self.fragments.len();
        self.fragments.push(Fragment {
            prev,
            next,
            ..Fragment::default()
        });
        index
    }
}

impl<W: Write> FragmentSink for SpoolSink<W> {
    fn append_fragment(&mut self) -> Result<FragmentId> {
        let index = self.push(self.last, None);
        if let Some(last) = self.last {
            self.fragments[last].next = Some(index);
        }
        self.last = Some(index);
        if self.head.is_none() {
            self.promote(index)?;
        }
        Ok(FragmentId(index))
    }

    fn insert_fragment_before(&mut self, anchor: FragmentId) -> Result<FragmentId> {
        let anchor_fragment = self.fragment_mut(anchor)?;
        if anchor_fragment.base.is_some() {
            return Err(Error::illegal(format!(
                "cannot insert before fragment {}: it has already been emitted",
                anchor.0
            )));
        }
        let prev = anchor_fragment.prev;
        let index = self.push(prev, Some(anchor.0));
        self.fragments[anchor.0].prev = Some(index);
        if let Some(prev) = prev {
            self.fragments[prev].next = Some(index);
        }
        Ok(FragmentId(index))
    }

    fn write(&mut self, fragment: FragmentId, data: &[u8]) -> Result<()> {
        let entry = self.fragment_mut(fragment)?;
        if entry.closed {
            return Err(Error::illegal(format!(
                "write to closed fragment {}",
                fragment.0
            )));
        }
        if self.head == Some(fragment.0) {
            return self.emit(data);
        }
        self.fragments[fragment.0].buffer.extend_from_slice(data);
        self.buffered += data.len();
        self.peak_buffered = self.peak_buffered.max(self.buffered);
        Ok(())
    }

    fn close_fragment(&mut self, fragment: FragmentId) -> Result<()> {
        let entry = self.fragment_mut(fragment)?;
        if entry.closed {
            return Err(Error::illegal(format!(
                "fragment {} closed twice",
                fragment.0
            )));
        }
        entry.closed = true;
        self.advance()
    }

    fn position_info(&self) -> Result<PositionInfo> {
        if let Some(head) = self.head {
            if self.fragments[head].next.is_some() {
                return Err(Error::illegal(
                    "positions requested while earlier fragments are still open",
                ));
            }
        }
        let bases = self
            .fragments
            .iter()
            .enumerate()
            .filter_map(|(index, f)| f.base.map(|base| (FragmentId(index), base)))
            .collect();
        Ok(PositionInfo {
            bases,
            length: self.written,
        })
    }

    fn finish(&mut self) -> Result<()> {
        let open = self.fragments.iter().filter(|f| !f.closed).count();
        if open > 0 {
            return Err(Error::illegal(format!(
                "{} fragment(s) still open at finish",
                open
            )));
        }
        log::debug!(
            "sink finished: {} bytes in {} fragments, peak buffered {} bytes",
            self.written,
            self.fragments.len(),
            self.peak_buffered
        );
        match self.out.as_mut() {
            Some(out) => out.flush()?,
            None => return Err(Error::illegal("sink output already taken")),
        }
        Ok(())
    }
}
