//! Document orchestrator.
//!
//! A [`PdfDocument`] owns the sink for one output and drives the whole
//! assembly: header, page tree, page contents, shared resources, metadata
//! and finally the cross-reference table.
//!
//! The file is laid out as two fragment chains:
//!
//! ```text
//! header | body (pages, images, fonts, outline, ...) | Pages | Catalog | xref
//! ```
//!
//! The body is forked off the tail right after the header, so everything
//! written through the body lands before the page tree, and every page
//! is a further fork of the body. Pages can therefore be written in any
//! order and stay open side by side; the sink streams each fragment as
//! soon as everything in front of it is finished.
//!
//! # Example
//!
//! ```no_run
//! use pdf_spool::{PdfDocument, WriterConfig};
//! use pdf_spool::structure::{PageSetup, StandardFont};
//!
//! let mut doc = PdfDocument::create("out.pdf", WriterConfig::new())?;
//! let mut page = doc.create_page(PageSetup::a4())?;
//! let font = doc.use_font(&mut page, &StandardFont::Helvetica.into())?;
//! page.write_content(format!("BT /{} 12 Tf 72 770 Td (Hello) Tj ET", font).as_bytes())?;
//! page.finish()?;
//! doc.close()?;
//! # Ok::<(), pdf_spool::Error>(())
//! ```

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, FixedOffset, Local};
use md5::{Digest, Md5};

use crate::config::{PdfVersion, WriterConfig};
use crate::encryption::{SecurityHandler, StandardSecurityHandler};
use crate::error::{Error, Result};
use crate::filters::StreamMode;
use crate::object::ObjectRef;
use crate::sink::{FragmentSink, SharedSink, SpoolSink};
use crate::structure::metadata::{write_info, write_xmp};
use crate::structure::{
    BookmarkId, Destination, EmbeddedFile, Font, FontTable, ImageSource, ImageTable, Layer,
    Layers, LinkTarget, NameTree, Outline, PageSetup, PageTree, ResourceFlow, ResourceKind,
};
use crate::writer::{FragmentWriter, Trailer, WriterContext, XrefTable};

/// Comment after the header marking the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocState {
    Open,
    Closed,
}

/// A PDF file being assembled into `W`.
pub struct PdfDocument<W: Write + 'static> {
    sink: Rc<RefCell<SpoolSink<W>>>,
    config: WriterConfig,
    /// Header, page tree, catalog and xref.
    tail: FragmentWriter,
    /// Everything else; written before the page tree.
    body: FragmentWriter,
    pages: PageTree,
    catalog: ObjectRef,
    security: Option<Rc<StandardSecurityHandler>>,
    file_id: [u8; 16],
    created: DateTime<FixedOffset>,
    fonts: FontTable,
    images: ImageTable,
    layers: Layers,
    outline: Outline,
    dests: NameTree<Destination>,
    attachments: NameTree<ObjectRef>,
    state: DocState,
}

impl PdfDocument<BufWriter<File>> {
    /// Create the file at `path` and start a document in it.
    pub fn create(path: impl AsRef<Path>, config: WriterConfig) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        log::debug!("writing {}", path.as_ref().display());
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write + 'static> PdfDocument<W> {
    /// Start a document written to `out`.
    ///
    /// Version checks for document-wide features (encryption, XMP) run
    /// here, before the header is written.
    pub fn new(out: W, config: WriterConfig) -> Result<Self> {
        if config.xmp_metadata {
            config.version.require(PdfVersion::V1_4, "XMP metadata")?;
        }
        let created = match config.info.creation_date {
            Some(date) => date,
            None => {
                let now = Local::now();
                now.with_timezone(now.offset())
            },
        };
        let file_id = file_identifier(config.info.title.as_deref());

        let sink = Rc::new(RefCell::new(SpoolSink::new(out)));
        let shared: SharedSink = sink.clone();
        let mut context = WriterContext::new(shared, &config);
        let (catalog, pages_ref) = {
            let mut objects = context.objects().borrow_mut();
            (objects.next_ref(), objects.next_ref())
        };
        let security = match &config.encryption {
            Some(encryption) => {
                let dictionary = context.objects().borrow_mut().next_ref();
                let handler = Rc::new(StandardSecurityHandler::new(
                    encryption,
                    &file_id,
                    dictionary,
                    config.version,
                )?);
                context = context.with_security(handler.clone());
                Some(handler)
            },
            None => None,
        };

        let mut tail = FragmentWriter::new(context)?;
        tail.write_raw(format!("%PDF-{}\n", config.version.as_str()).as_bytes())?;
        if config.binary_marker {
            tail.write_raw(BINARY_MARKER)?;
        }
        let body = tail.fork()?;
        let pages = PageTree::new(&mut tail, pages_ref)?;
        log::debug!(
            "document opened: PDF {}, compression {:?}, encrypted: {}",
            config.version.as_str(),
            config.compression,
            security.is_some()
        );

        Ok(Self {
            sink,
            config,
            tail,
            body,
            pages,
            catalog,
            security,
            file_id,
            created,
            fonts: FontTable::new(),
            images: ImageTable::new(),
            layers: Layers::new(),
            outline: Outline::new(),
            dests: NameTree::new(),
            attachments: NameTree::new(),
            state: DocState::Open,
        })
    }

    /// Target PDF version.
    pub fn version(&self) -> PdfVersion {
        self.config.version
    }

    /// Configuration the document was opened with.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// The 16-byte file identifier written to the trailer.
    pub fn file_id(&self) -> &[u8; 16] {
        &self.file_id
    }

    /// Number of pages created so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Largest number of bytes the sink has held back so far.
    pub fn peak_buffered(&self) -> usize {
        self.sink.borrow().peak_buffered()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state == DocState::Closed
    }

    /// The body writer, for objects the caller writes directly.
    ///
    /// Objects written here land before the page tree. Reserve their
    /// numbers with [`next_ref`](Self::next_ref).
    pub fn writer(&mut self) -> &mut FragmentWriter {
        &mut self.body
    }

    /// Allocate an object number.
    pub fn next_ref(&self) -> ObjectRef {
        self.body.next_ref()
    }

    /// Start a new page and open its content stream.
    ///
    /// The page is added to the page tree immediately; its content can be
    /// written while other pages are still open.
    pub fn create_page(&mut self, setup: PageSetup) -> Result<Page> {
        self.ensure_open()?;
        setup.validate(self.config.version)?;
        let page = self.body.next_ref();
        let contents = self.body.next_ref();

        let mut writer = self.body.fork()?;
        let resources = self.pages.write_page(&mut writer, page, &setup, contents)?;
        writer.start_object(contents)?;
        writer.start_hash()?;
        writer.begin_stream(StreamMode::Ascii)?;
        log::debug!("page {} started ({} of document)", page, self.pages.len());
        Ok(Page {
            obj: page,
            writer,
            resources,
            finished: false,
        })
    }

    /// Register `font` on `page`; returns the resource name for `Tf`.
    ///
    /// The font objects are written when the document is closed.
    pub fn use_font(&mut self, page: &mut Page, font: &Font) -> Result<String> {
        self.ensure_open()?;
        page.ensure_open()?;
        let (name, obj) = self.fonts.use_font(&self.body, font)?;
        page.resources.add(ResourceKind::Font, &name, obj)?;
        Ok(name)
    }

    /// Register an image on `page`; returns the resource name for `Do`.
    ///
    /// The image is embedded the first time its source is used.
    pub fn use_image(&mut self, page: &mut Page, source: &ImageSource) -> Result<String> {
        self.ensure_open()?;
        page.ensure_open()?;
        let (name, obj) = self.images.use_image(&mut self.body, source)?;
        page.resources.add(ResourceKind::XObject, &name, obj)?;
        Ok(name)
    }

    /// Create an optional content group. Requires PDF 1.5.
    pub fn add_layer(&mut self, name: &str, visible: bool) -> Result<Layer> {
        self.ensure_open()?;
        self.layers.add(&mut self.body, name, visible)
    }

    /// List `layer` in the page's `/Properties`; returns the name for
    /// `/OC /name BDC`.
    pub fn use_layer(&mut self, page: &mut Page, layer: &Layer) -> Result<String> {
        self.ensure_open()?;
        page.ensure_open()?;
        let name = layer.resource_name();
        page.resources
            .add(ResourceKind::Properties, &name, layer.object_ref())?;
        Ok(name)
    }

    /// Open a bookmark under the current one.
    ///
    /// An empty title makes an untitled bookmark, dropped at close unless
    /// it gains children.
    pub fn start_bookmark(&mut self, title: &str, target: Option<LinkTarget>) -> Result<BookmarkId> {
        self.ensure_open()?;
        let title = (!title.is_empty()).then(|| title.to_string());
        Ok(self.outline.start_bookmark(title, target))
    }

    /// Close the current bookmark.
    pub fn end_bookmark(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.outline.end_bookmark()
    }

    /// The outline, for styling bookmarks after they were started.
    pub fn outline_mut(&mut self) -> &mut Outline {
        &mut self.outline
    }

    /// Add `dest` to the `Dests` name tree under `name`.
    pub fn add_named_destination(&mut self, name: &str, dest: Destination) -> Result<()> {
        self.ensure_open()?;
        if self.dests.contains_key(name.as_bytes()) {
            return Err(Error::InvalidArgument(format!(
                "named destination '{}' already defined",
                name
            )));
        }
        self.dests.insert(name, dest);
        Ok(())
    }

    /// Embed `file` and list it in the `EmbeddedFiles` name tree.
    ///
    /// Returns the file specification. Requires PDF 1.3.
    pub fn attach_file(&mut self, file: EmbeddedFile) -> Result<ObjectRef> {
        self.ensure_open()?;
        if self.attachments.contains_key(file.name.as_bytes()) {
            return Err(Error::InvalidArgument(format!(
                "attachment '{}' already exists",
                file.name
            )));
        }
        let filespec = file.write(&mut self.body)?;
        self.attachments.insert(file.name.as_str(), filespec);
        Ok(filespec)
    }

    /// Finish the document: deferred objects, page tree, catalog, xref.
    ///
    /// Every page must have been finished. The document is unusable after
    /// this call whether or not it succeeds.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = DocState::Closed;
        self.body.context().ensure_intact()?;

        let open = self.body.outstanding_forks();
        if open > 0 {
            return Err(Error::illegal(format!(
                "{} page(s) or reserved slot(s) still open at close",
                open
            )));
        }

        let outline = self.outline.write(&mut self.body)?;
        self.fonts.close(&mut self.body)?;
        let dests = self.dests.write(&mut self.body, |w, dest| dest.write(w))?;
        let files = self
            .attachments
            .write(&mut self.body, |w, filespec| w.write_object_ref(*filespec))?;
        let metadata = if self.config.xmp_metadata {
            Some(write_xmp(&mut self.body, &self.config.info, &self.created)?)
        } else {
            None
        };
        let info = write_info(&mut self.body, &self.config.info, &self.created)?;
        if let Some(security) = &self.security {
            security.write_dictionary(&mut self.body)?;
        }
        self.body.close()?;
        self.pages.close()?;

        self.write_catalog(outline, dests, files, metadata)?;

        let positions = self.sink.borrow().position_info()?;
        let trailer = Trailer {
            root: self.catalog,
            info: Some(info),
            file_id: self.file_id,
            encrypt: self.security.as_ref().map(|s| s.dictionary_ref()),
        };
        let objects = self.tail.context().objects().clone();
        let start = XrefTable::new(objects).close(&mut self.tail, &positions, &trailer)?;
        self.tail.close()?;
        self.sink.borrow_mut().finish()?;

        log::debug!(
            "document closed: {} page(s), {} font(s), {} image(s), xref at {}, {} bytes",
            self.pages.len(),
            self.fonts.len(),
            self.images.len(),
            start,
            self.sink.borrow().bytes_written()
        );
        Ok(())
    }

    /// Hand back the output of a closed document.
    pub fn into_inner(self) -> Result<W> {
        if self.state != DocState::Closed {
            return Err(Error::illegal("into_inner before close"));
        }
        self.sink
            .borrow_mut()
            .take_output()
            .ok_or_else(|| Error::illegal("output already taken"))
    }

    fn write_catalog(
        &mut self,
        outline: Option<ObjectRef>,
        dests: Option<ObjectRef>,
        files: Option<ObjectRef>,
        metadata: Option<ObjectRef>,
    ) -> Result<()> {
        let w = &mut self.tail;
        w.start_object(self.catalog)?;
        w.start_hash()?;
        w.write_name("Type")?;
        w.write_name("Catalog")?;
        w.write_name("Pages")?;
        w.write_object_ref(self.pages.object_ref())?;
        if let Some(outline) = outline {
            w.write_name("Outlines")?;
            w.write_object_ref(outline)?;
            if self.config.show_outline {
                w.write_name("PageMode")?;
                w.write_name("UseOutlines")?;
            }
        }
        if dests.is_some() || files.is_some() {
            w.write_name("Names")?;
            w.start_hash()?;
            if let Some(dests) = dests {
                w.write_name("Dests")?;
                w.write_object_ref(dests)?;
            }
            if let Some(files) = files {
                w.write_name("EmbeddedFiles")?;
                w.write_object_ref(files)?;
            }
            w.end_hash()?;
        }
        self.layers.write_properties(w)?;
        if let Some(metadata) = metadata {
            w.write_name("Metadata")?;
            w.write_object_ref(metadata)?;
        }
        w.end_hash()?;
        w.end_object()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            DocState::Open => Ok(()),
            DocState::Closed => Err(Error::illegal("document already closed")),
        }
    }
}

impl<W: Write + 'static> Drop for PdfDocument<W> {
    fn drop(&mut self) {
        if self.state == DocState::Open {
            log::warn!("document dropped without close; output is incomplete");
        }
    }
}

/// MD5 over a fresh UUID, the current time and the title.
fn file_identifier(title: Option<&str>) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    hasher.update(nanos.to_le_bytes());
    if let Some(title) = title {
        hasher.update(title.as_bytes());
    }
    hasher.finalize().into()
}

/// One page being written.
///
/// The content stream stays open until [`finish`](Self::finish); anything
/// written through [`write_content`](Self::write_content) or `io::Write`
/// goes through the document's ASCII filter chain.
#[must_use = "a page must be finished before the document is closed"]
pub struct Page {
    obj: ObjectRef,
    writer: FragmentWriter,
    resources: ResourceFlow,
    finished: bool,
}

impl Page {
    /// The page object.
    pub fn object_ref(&self) -> ObjectRef {
        self.obj
    }

    /// Append content stream operators.
    pub fn write_content(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.writer.write_stream(data)
    }

    /// The page's resource dictionary.
    pub fn resources(&mut self) -> &mut ResourceFlow {
        &mut self.resources
    }

    /// Whether [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Close the content stream and the resource dictionary.
    pub fn finish(mut self) -> Result<()> {
        self.finish_inner()
    }

    fn finish_inner(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let length = self.writer.end_stream()?;
        self.writer.end_object()?;
        self.resources.close()?;
        self.writer.close()?;
        log::trace!("page {} finished: {} content bytes", self.obj, length);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::illegal(format!("page {} already finished", self.obj)));
        }
        Ok(())
    }
}

impl Write for Page {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_content(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("page {} dropped without finish; finishing it", self.obj);
            if let Err(e) = self.finish_inner() {
                log::error!("failed to finish page {}: {}", self.obj, e);
            }
        }
    }
}
