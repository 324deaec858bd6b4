//! Token-level writer over one fragment.
//!
//! A [`FragmentWriter`] owns the tail of one fragment and writes PDF tokens
//! into it: object headers, dictionaries, arrays, scalars, strings and
//! stream bodies. [`FragmentWriter::fork`] reserves a slot at the current
//! position: the returned writer fills the slot while the original carries
//! on after it, so a value can be supplied long after the bytes that follow
//! it were produced.
//!
//! # State machine
//!
//! ```text
//! Idle --start_object--> InObject --start_hash--> (dictionary)
//!      <--end_object---           --start_stream--> (stream) --end_stream--> InObject
//! ```
//!
//! `fork()` is legal anywhere except inside a stream. `close()` is legal only
//! outside objects, streams and containers, once every forked child has been
//! closed.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset};

use crate::config::{Compression, PdfVersion, TextEncoding, WriterConfig};
use crate::encryption::{ObjectEncryptor, SecurityHandler};
use crate::error::{Error, Result};
use crate::filters::{encoder_chain, filter_chain, StreamLayer, StreamMode};
use crate::object::{ObjectRef, ObjectTable, SharedObjectTable};
use crate::sink::{FragmentId, FragmentOutput, SharedSink};

mod stream;
mod tokens;
mod xref;

pub use stream::StreamWriter;
pub use xref::{Trailer, XrefTable};

use stream::{FragmentLayer, OpenStream};

/// Everything the writers of one document share.
#[derive(Clone)]
pub struct WriterContext {
    sink: SharedSink,
    objects: SharedObjectTable,
    security: Option<Rc<dyn SecurityHandler>>,
    version: PdfVersion,
    compression: Compression,
    text_encoding: TextEncoding,
    /// First protocol violation detected after the fact, from a drop.
    broken: Rc<RefCell<Option<String>>>,
}

impl WriterContext {
    /// Context writing into `sink` with a fresh allocator.
    pub fn new(sink: SharedSink, config: &WriterConfig) -> Self {
        Self {
            sink,
            objects: Rc::new(RefCell::new(ObjectTable::new())),
            security: None,
            version: config.version,
            compression: config.compression,
            text_encoding: config.text_encoding,
            broken: Rc::new(RefCell::new(None)),
        }
    }

    /// Encrypt every object through `handler`.
    pub fn with_security(mut self, handler: Rc<dyn SecurityHandler>) -> Self {
        self.security = Some(handler);
        self
    }

    /// The shared sink.
    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// The shared object allocator.
    pub fn objects(&self) -> &SharedObjectTable {
        &self.objects
    }

    /// Target PDF version.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Record that the output can no longer be completed. The first reason wins.
    pub(crate) fn mark_broken(&self, reason: String) {
        let mut broken = self.broken.borrow_mut();
        if broken.is_none() {
            log::error!("{}", reason);
            *broken = Some(reason);
        }
    }

    /// Fails with [`Error::IllegalState`] once a writer was dropped mid-token.
    pub fn ensure_intact(&self) -> Result<()> {
        match &*self.broken.borrow() {
            Some(reason) => Err(Error::illegal(format!("output is corrupt: {}", reason))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InObject,
    /// Forked from inside an object: values only, no object headers.
    InSlot,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Hash,
    Array,
}

/// Writer for one fragment. See the [module docs](self).
#[must_use = "a writer reserves a fragment that must be closed"]
pub struct FragmentWriter {
    context: WriterContext,
    fragment: FragmentId,
    /// Fragment this writer's new fragments are inserted before.
    anchor: Option<FragmentId>,
    offset: u64,
    state: State,
    containers: Vec<Container>,
    current_object: Option<ObjectRef>,
    encryptor: Option<Rc<dyn ObjectEncryptor>>,
    stream: Option<Box<OpenStream>>,
    needs_space: bool,
    /// Forked children not closed yet.
    outstanding: Rc<Cell<usize>>,
    parent: Option<Rc<Cell<usize>>>,
}

impl FragmentWriter {
    /// Writer on a new fragment appended at the end of the sink.
    pub fn new(context: WriterContext) -> Result<Self> {
        let fragment = context.sink.borrow_mut().append_fragment()?;
        Ok(Self {
            context,
            fragment,
            anchor: None,
            offset: 0,
            state: State::Idle,
            containers: Vec::new(),
            current_object: None,
            encryptor: None,
            stream: None,
            needs_space: false,
            outstanding: Rc::new(Cell::new(0)),
            parent: None,
        })
    }

    /// Shared context.
    pub fn context(&self) -> &WriterContext {
        &self.context
    }

    /// Target PDF version.
    pub fn version(&self) -> PdfVersion {
        self.context.version
    }

    /// Allocate an object number.
    pub fn next_ref(&self) -> ObjectRef {
        self.context.objects.borrow_mut().next_ref()
    }

    /// Current fragment and offset within it.
    pub fn position(&self) -> (FragmentId, u64) {
        (self.fragment, self.offset)
    }

    /// Object being written, if any (inherited by slots forked inside it).
    pub fn current_object(&self) -> Option<ObjectRef> {
        self.current_object
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Number of forked writers not closed yet.
    pub fn outstanding_forks(&self) -> usize {
        self.outstanding.get()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.state == State::Closed {
            return Err(Error::illegal("write after close"));
        }
        if self.stream.is_some() {
            return Err(Error::illegal("token written while a stream body is open"));
        }
        Ok(())
    }

    fn emit(&mut self, data: &[u8]) -> Result<()> {
        self.context.sink.borrow_mut().write(self.fragment, data)?;
        self.offset += data.len() as u64;
        Ok(())
    }

    /// Write a token, separated from the previous one when needed.
    fn token(&mut self, data: &[u8], space_after: bool) -> Result<()> {
        self.ensure_writable()?;
        if self.needs_space {
            let mut buffer = Vec::with_capacity(data.len() + 1);
            buffer.push(b' ');
            buffer.extend_from_slice(data);
            self.emit(&buffer)?;
        } else {
            self.emit(data)?;
        }
        self.needs_space = space_after;
        Ok(())
    }

    fn closing(&mut self, expected: Container, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        match self.containers.last() {
            Some(open) if *open == expected => {},
            other => {
                return Err(Error::illegal(format!(
                    "cannot close {:?}: innermost open container is {:?}",
                    expected, other
                )))
            },
        }
        self.containers.pop();
        self.emit(data)?;
        self.needs_space = true;
        Ok(())
    }

    /// Start indirect object `obj` and record its position.
    pub fn start_object(&mut self, obj: ObjectRef) -> Result<()> {
        self.ensure_writable()?;
        match self.state {
            State::Idle => {},
            State::InObject => {
                return Err(Error::illegal(format!(
                    "cannot start {} inside object {}",
                    obj,
                    self.current_object.map(|r| r.id).unwrap_or(0)
                )))
            },
            _ => {
                return Err(Error::illegal(format!(
                    "cannot start {} in a slot reserved inside another object",
                    obj
                )))
            },
        }
        if !self.containers.is_empty() {
            return Err(Error::illegal("object started inside an open container"));
        }
        self.context
            .objects
            .borrow_mut()
            .set_position(obj, self.fragment, self.offset)?;
        self.emit(format!("{} {} obj\n", obj.id, obj.gen).as_bytes())?;
        self.state = State::InObject;
        self.current_object = Some(obj);
        self.encryptor = self
            .context
            .security
            .as_ref()
            .and_then(|handler| handler.for_object(obj));
        self.needs_space = false;
        Ok(())
    }

    /// End the current indirect object.
    pub fn end_object(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if self.state != State::InObject {
            return Err(Error::illegal("end_object without a matching start_object"));
        }
        if !self.containers.is_empty() {
            return Err(Error::illegal(format!(
                "object ended with {} unclosed container(s)",
                self.containers.len()
            )));
        }
        self.emit(b"\nendobj\n")?;
        self.state = State::Idle;
        self.current_object = None;
        self.encryptor = None;
        self.needs_space = false;
        Ok(())
    }

    /// Write `<<`.
    pub fn start_hash(&mut self) -> Result<()> {
        self.token(b"<<", false)?;
        self.containers.push(Container::Hash);
        Ok(())
    }

    /// Write `>>`.
    pub fn end_hash(&mut self) -> Result<()> {
        self.closing(Container::Hash, b">>")
    }

    /// Write `[`.
    pub fn start_array(&mut self) -> Result<()> {
        self.token(b"[", false)?;
        self.containers.push(Container::Array);
        Ok(())
    }

    /// Write `]`.
    pub fn end_array(&mut self) -> Result<()> {
        self.closing(Container::Array, b"]")
    }

    /// Write a name, e.g. `write_name("Type")` gives `/Type`.
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        let mut out = Vec::with_capacity(name.len() + 1);
        tokens::encode_name(name, &mut out);
        self.token(&out, true)
    }

    /// Write an integer.
    pub fn write_int(&mut self, value: i64) -> Result<()> {
        self.token(value.to_string().as_bytes(), true)
    }

    /// Write a real number.
    pub fn write_real(&mut self, value: f64) -> Result<()> {
        self.token(tokens::format_real(value).as_bytes(), true)
    }

    /// Write `true` or `false`.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.token(if value { b"true" } else { b"false" }, true)
    }

    /// Write `null`.
    pub fn write_null(&mut self) -> Result<()> {
        self.token(b"null", true)
    }

    /// Write `N G R`.
    pub fn write_object_ref(&mut self, obj: ObjectRef) -> Result<()> {
        self.token(format!("{} {} R", obj.id, obj.gen).as_bytes(), true)
    }

    /// Write a byte string, encrypted for the current object when required.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut out = Vec::with_capacity(data.len() + 2);
        match self.encryptor.clone() {
            Some(encryptor) => tokens::encode_hex_string(&encryptor.encrypt_string(data)?, &mut out),
            None => tokens::encode_string(data, &mut out),
        }
        self.token(&out, true)
    }

    /// Write a text string in the configured text encoding.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let encoded = tokens::encode_text(text, self.context.text_encoding);
        self.write_bytes(&encoded)
    }

    /// Write a date string (`D:YYYYMMDDHHmmSS+HH'mm'`).
    pub fn write_date(&mut self, date: &DateTime<FixedOffset>) -> Result<()> {
        self.write_bytes(tokens::format_date(date).as_bytes())
    }

    /// Write a rectangle `[llx lly urx ury]`.
    pub fn write_rect(&mut self, rect: [f64; 4]) -> Result<()> {
        self.start_array()?;
        for value in rect {
            self.write_real(value)?;
        }
        self.end_array()
    }

    /// Write bytes verbatim, e.g. the header or a comment.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.emit(data)?;
        if let Some(last) = data.last() {
            self.needs_space = !last.is_ascii_whitespace();
        }
        Ok(())
    }

    /// Close the stream dictionary and open its body.
    ///
    /// Writes `/Filter` and `/Length` (reserved through a fork), then `>>`
    /// and `stream`. The body goes through the filter chain for `mode` and,
    /// for encrypted objects, the object's cipher.
    pub fn begin_stream(&mut self, mode: StreamMode) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::illegal("a stream is already open on this writer"));
        }
        self.ensure_writable()?;
        if self.state != State::InObject || self.containers != [Container::Hash] {
            return Err(Error::illegal(
                "a stream must follow the top-level dictionary of an indirect object",
            ));
        }

        let filters = filter_chain(mode, self.context.compression);
        match filters {
            [] => {},
            [single] => {
                self.write_name("Filter")?;
                self.write_name(single.pdf_name())?;
            },
            several => {
                self.write_name("Filter")?;
                self.start_array()?;
                for filter in several {
                    self.write_name(filter.pdf_name())?;
                }
                self.end_array()?;
            },
        }
        self.write_name("Length")?;
        let length = self.fork()?;
        self.end_hash()?;
        self.emit(b"\nstream\n")?;

        let mut sink: Box<dyn StreamLayer> = Box::new(FragmentLayer::new(FragmentOutput::open(
            self.context.sink.clone(),
            self.fragment,
        )));
        if let Some(encryptor) = &self.encryptor {
            sink = encryptor.wrap(sink)?;
        }
        self.stream = Some(Box::new(OpenStream {
            chain: encoder_chain(filters, sink),
            length,
        }));
        Ok(())
    }

    /// Write body bytes to the open stream.
    pub fn write_stream(&mut self, data: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::illegal("no stream is open"))?;
        stream.chain.write_all(data).map_err(Error::from_io)
    }

    /// Finish the body, write `endstream` and fill in `/Length`.
    ///
    /// Returns the number of encoded bytes. The line break before
    /// `endstream` is not counted.
    pub fn end_stream(&mut self) -> Result<u64> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| Error::illegal("end_stream without an open stream"))?;
        let OpenStream { chain, mut length } = *stream;
        let written = chain.finish().map_err(Error::from_io)?;
        self.offset += written;
        self.emit(b"\nendstream")?;
        self.needs_space = true;
        length.write_int(written as i64)?;
        length.close()?;
        Ok(written)
    }

    /// [`begin_stream`](Self::begin_stream) returning a byte sink that ends
    /// the stream when finished or dropped.
    pub fn start_stream(&mut self, mode: StreamMode) -> Result<StreamWriter<'_>> {
        self.begin_stream(mode)?;
        Ok(StreamWriter::new(self))
    }

    /// Reserve a slot at the current position.
    ///
    /// Content written to the returned writer appears in the file after
    /// everything written here so far and before everything written here
    /// afterwards. The returned writer must be closed before this one.
    pub fn fork(&mut self) -> Result<FragmentWriter> {
        self.ensure_writable()?;
        let (slot, continuation) = {
            let mut sink = self.context.sink.borrow_mut();
            let mut create = || match self.anchor {
                Some(anchor) => sink.insert_fragment_before(anchor),
                None => sink.append_fragment(),
            };
            let slot = create()?;
            let continuation = create()?;
            sink.close_fragment(self.fragment)?;
            (slot, continuation)
        };
        log::trace!(
            "fork: fragment {} -> slot {}, continuing in {}",
            self.fragment.index(),
            slot.index(),
            continuation.index()
        );

        self.fragment = continuation;
        self.offset = 0;
        self.outstanding.set(self.outstanding.get() + 1);

        let state = match self.state {
            State::Idle => State::Idle,
            _ => State::InSlot,
        };
        let child = FragmentWriter {
            context: self.context.clone(),
            fragment: slot,
            anchor: Some(continuation),
            offset: 0,
            state,
            containers: Vec::new(),
            current_object: self.current_object,
            encryptor: self.encryptor.clone(),
            stream: None,
            needs_space: self.needs_space,
            outstanding: Rc::new(Cell::new(0)),
            parent: Some(self.outstanding.clone()),
        };
        self.needs_space = true;
        Ok(child)
    }

    /// Close the writer. Any further use is an error.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            State::Closed => return Err(Error::illegal("writer closed twice")),
            State::InObject => {
                return Err(Error::illegal(format!(
                    "cannot close while object {} is open",
                    self.current_object.map(|r| r.id).unwrap_or(0)
                )))
            },
            State::Idle | State::InSlot => {},
        }
        if self.stream.is_some() {
            return Err(Error::illegal("cannot close while a stream is open"));
        }
        if !self.containers.is_empty() {
            return Err(Error::illegal(format!(
                "cannot close with {} unclosed container(s)",
                self.containers.len()
            )));
        }
        let outstanding = self.outstanding.get();
        if outstanding > 0 {
            return Err(Error::illegal(format!(
                "cannot close with {} forked writer(s) still open",
                outstanding
            )));
        }
        self.context.sink.borrow_mut().close_fragment(self.fragment)?;
        self.mark_closed();
        Ok(())
    }

    /// Why dropping this writer now would leave broken syntax behind.
    fn unclean_reason(&self) -> Option<String> {
        let fragment = self.fragment.index();
        if self.stream.is_some() {
            return Some(format!("writer {} dropped inside a stream body", fragment));
        }
        if self.state == State::InObject {
            return Some(format!(
                "writer {} dropped inside object {}",
                fragment,
                self.current_object.map(|r| r.id).unwrap_or(0)
            ));
        }
        if !self.containers.is_empty() {
            return Some(format!(
                "writer {} dropped with {} unclosed container(s)",
                fragment,
                self.containers.len()
            ));
        }
        if self.state == State::InSlot && self.offset == 0 {
            return Some(format!("value slot {} dropped empty", fragment));
        }
        None
    }

    fn mark_closed(&mut self) {
        self.state = State::Closed;
        if let Some(parent) = &self.parent {
            parent.set(parent.get().saturating_sub(1));
        }
    }
}

impl Drop for FragmentWriter {
    fn drop(&mut self) {
        if self.state == State::Closed {
            return;
        }
        match self.unclean_reason() {
            Some(reason) => self.context.mark_broken(reason),
            None => log::warn!(
                "writer for fragment {} dropped without close",
                self.fragment.index()
            ),
        }
        // Closes the Length slot through its own drop
        self.stream.take();
        let closed = match self.context.sink.try_borrow_mut() {
            Ok(mut sink) => sink.close_fragment(self.fragment),
            Err(_) => Err(Error::illegal("sink busy")),
        };
        if let Err(e) = closed {
            log::error!("failed to close fragment {}: {}", self.fragment.index(), e);
        }
        self.mark_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FragmentSink, SpoolSink};

    type TestSink = Rc<RefCell<SpoolSink<Vec<u8>>>>;

    fn setup(compression: Compression) -> (TestSink, FragmentWriter) {
        let sink: TestSink = Rc::new(RefCell::new(SpoolSink::new(Vec::new())));
        let config = WriterConfig::new().with_compression(compression);
        let context = WriterContext::new(sink.clone(), &config);
        let writer = FragmentWriter::new(context).unwrap();
        (sink, writer)
    }

    fn output(sink: &TestSink) -> String {
        let mut sink = sink.borrow_mut();
        sink.finish().unwrap();
        String::from_utf8_lossy(&sink.take_output().unwrap()).into_owned()
    }

    #[test]
    fn test_simple_object() {
        let (sink, mut w) = setup(Compression::None);
        let r = w.next_ref();
        w.start_object(r).unwrap();
        w.start_hash().unwrap();
        w.write_name("Type").unwrap();
        w.write_name("Example").unwrap();
        w.write_name("Size").unwrap();
        w.write_int(42).unwrap();
        w.write_name("Ratio").unwrap();
        w.write_real(0.25).unwrap();
        w.write_name("Items").unwrap();
        w.start_array().unwrap();
        w.write_bool(true).unwrap();
        w.write_null().unwrap();
        w.write_object_ref(r).unwrap();
        w.end_array().unwrap();
        w.write_name("Title").unwrap();
        w.write_text("Hi (there)").unwrap();
        w.end_hash().unwrap();
        w.end_object().unwrap();
        w.close().unwrap();

        assert_eq!(
            output(&sink),
            "1 0 obj\n<</Type /Example /Size 42 /Ratio 0.25 /Items [true null 1 0 R] /Title (Hi \\(there\\))>>\nendobj\n"
        );
    }

    #[test]
    fn test_fork_fills_slot_later() {
        let (sink, mut w) = setup(Compression::None);
        w.write_raw(b"A").unwrap();
        let mut slot = w.fork().unwrap();
        w.write_raw(b"C").unwrap();
        slot.write_raw(b"B").unwrap();
        assert!(w.close().is_err());
        slot.close().unwrap();
        w.close().unwrap();
        assert_eq!(output(&sink), "ABC");
    }

    #[test]
    fn test_nested_forks_keep_order() {
        let (sink, mut w) = setup(Compression::None);
        w.write_raw(b"1").unwrap();
        let mut outer = w.fork().unwrap();
        w.write_raw(b"5").unwrap();
        outer.write_raw(b"2").unwrap();
        let mut inner = outer.fork().unwrap();
        outer.write_raw(b"4").unwrap();
        inner.write_raw(b"3").unwrap();
        inner.close().unwrap();
        outer.close().unwrap();
        w.close().unwrap();
        assert_eq!(output(&sink), "12345");
    }

    #[test]
    fn test_object_protocol_violations() {
        let (_sink, mut w) = setup(Compression::None);
        assert!(matches!(w.end_object(), Err(Error::IllegalState(_))));
        let a = w.next_ref();
        let b = w.next_ref();
        w.start_object(a).unwrap();
        assert!(matches!(w.start_object(b), Err(Error::IllegalState(_))));
        assert!(w.close().is_err());
        w.start_hash().unwrap();
        assert!(w.end_array().is_err());
        assert!(w.end_object().is_err());
        w.end_hash().unwrap();
        w.end_object().unwrap();
        assert!(matches!(w.start_object(a), Err(Error::IllegalState(_))));
        w.close().unwrap();
        assert!(matches!(w.write_int(1), Err(Error::IllegalState(_))));
        assert!(matches!(w.close(), Err(Error::IllegalState(_))));
    }

    #[test]
    fn test_slot_inside_object_cannot_start_objects() {
        let (_sink, mut w) = setup(Compression::None);
        let a = w.next_ref();
        let b = w.next_ref();
        w.start_object(a).unwrap();
        let mut slot = w.fork().unwrap();
        assert_eq!(slot.current_object(), Some(a));
        assert!(slot.start_object(b).is_err());
        slot.write_int(3).unwrap();
        slot.close().unwrap();
        w.write_int(4).unwrap();
        w.end_object().unwrap();
        w.close().unwrap();
    }

    #[test]
    fn test_stream_length_is_patched() {
        let (sink, mut w) = setup(Compression::None);
        let r = w.next_ref();
        w.start_object(r).unwrap();
        w.start_hash().unwrap();
        let mut body = w.start_stream(StreamMode::Ascii).unwrap();
        body.write_all(b"0 0 m 10 10 l S").unwrap();
        assert_eq!(body.finish().unwrap(), 15);
        w.end_object().unwrap();
        w.close().unwrap();
        assert_eq!(
            output(&sink),
            "1 0 obj\n<</Length 15>>\nstream\n0 0 m 10 10 l S\nendstream\nendobj\n"
        );
    }

    #[test]
    fn test_stream_declares_filters() {
        let (sink, mut w) = setup(Compression::Ascii);
        let r = w.next_ref();
        w.start_object(r).unwrap();
        w.start_hash().unwrap();
        w.begin_stream(StreamMode::Binary).unwrap();
        w.write_stream(&[1, 2, 3]).unwrap();
        w.end_stream().unwrap();
        w.end_object().unwrap();
        w.close().unwrap();
        let text = output(&sink);
        assert!(text.contains("/Filter [/ASCII85Decode /FlateDecode] /Length "));
        assert!(text.ends_with("~>\nendstream\nendobj\n"));
    }

    #[test]
    fn test_stream_protocol_violations() {
        let (_sink, mut w) = setup(Compression::None);
        assert!(w.begin_stream(StreamMode::Raw).is_err());
        let r = w.next_ref();
        w.start_object(r).unwrap();
        w.start_hash().unwrap();
        w.begin_stream(StreamMode::Raw).unwrap();
        assert!(w.begin_stream(StreamMode::Raw).is_err());
        assert!(w.fork().is_err());
        assert!(w.write_name("X").is_err());
        assert!(w.end_object().is_err());
        w.end_stream().unwrap();
        assert!(w.end_stream().is_err());
        w.end_object().unwrap();
        w.close().unwrap();
    }

    #[test]
    fn test_dropped_fork_is_closed() {
        let (sink, mut w) = setup(Compression::None);
        w.write_raw(b"x").unwrap();
        {
            let _slot = w.fork().unwrap();
        }
        assert_eq!(w.outstanding_forks(), 0);
        assert!(w.context().ensure_intact().is_ok());
        w.write_raw(b"y").unwrap();
        w.close().unwrap();
        assert_eq!(output(&sink), "xy");
    }

    #[test]
    fn test_dropped_value_slot_breaks_output() {
        let (_sink, mut w) = setup(Compression::None);
        let r = w.next_ref();
        w.start_object(r).unwrap();
        w.start_hash().unwrap();
        w.write_name("Count").unwrap();
        {
            let _count = w.fork().unwrap();
        }
        w.end_hash().unwrap();
        w.end_object().unwrap();
        let result = w.context().ensure_intact();
        assert!(matches!(result, Err(Error::IllegalState(msg)) if msg.contains("dropped empty")));
        w.close().unwrap();
    }

    #[test]
    fn test_dropped_open_array_breaks_output() {
        let (_sink, mut w) = setup(Compression::None);
        {
            let mut slot = w.fork().unwrap();
            slot.start_array().unwrap();
            slot.write_int(1).unwrap();
        }
        assert!(w.context().ensure_intact().is_err());
        w.close().unwrap();
    }
}
