//! Font resources.
//!
//! Fonts are registered on first use and get a document-wide resource name
//! (`F1`, `F2`, ...). Their objects are allocated at that point but only
//! written when the table is closed, so a page can refer to a font whose
//! program is still to come.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::filters::StreamMode;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// The 14 standard Type 1 fonts every reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Helvetica-Oblique
    HelveticaOblique,
    /// Helvetica-BoldOblique
    HelveticaBoldOblique,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
    /// Times-Italic
    TimesItalic,
    /// Times-BoldItalic
    TimesBoldItalic,
    /// Courier
    Courier,
    /// Courier-Bold
    CourierBold,
    /// Courier-Oblique
    CourierOblique,
    /// Courier-BoldOblique
    CourierBoldOblique,
    /// Symbol
    Symbol,
    /// ZapfDingbats
    ZapfDingbats,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Symbolic fonts carry their own encoding.
    fn is_symbolic(&self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }
}

/// Metrics of an embedded font, in glyph space (1000 units per em).
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Maximum height above the baseline
    pub ascent: i32,
    /// Maximum depth below the baseline (negative)
    pub descent: i32,
    /// Height of flat capital letters
    pub cap_height: i32,
    /// Dominant vertical stem width
    pub stem_v: i32,
    /// Angle of dominant vertical strokes
    pub italic_angle: f32,
    /// Font bounding box
    pub bbox: [i32; 4],
    /// Font descriptor flags
    pub flags: u32,
    /// First character code covered by `widths`
    pub first_char: u8,
    /// Advance widths starting at `first_char`
    pub widths: Vec<u16>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            ascent: 800,
            descent: -200,
            cap_height: 700,
            stem_v: 80,
            italic_angle: 0.0,
            bbox: [0, -200, 1000, 800],
            // Nonsymbolic
            flags: 32,
            first_char: 32,
            widths: Vec::new(),
        }
    }
}

/// A TrueType program to embed.
///
/// Metrics are supplied by the caller; the program is embedded verbatim.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    base_name: String,
    program: Vec<u8>,
    metrics: FontMetrics,
}

impl TrueTypeFont {
    /// Wrap `program` under PostScript name `base_name`.
    pub fn new(base_name: impl Into<String>, program: Vec<u8>, metrics: FontMetrics) -> Result<Self> {
        let base_name = base_name.into();
        if base_name.is_empty() {
            return Err(Error::Font("font name is empty".to_string()));
        }
        if program.is_empty() {
            return Err(Error::Font(format!("{}: font program is empty", base_name)));
        }
        if metrics.first_char as usize + metrics.widths.len() > 256 {
            return Err(Error::Font(format!(
                "{}: {} widths from code {} exceed the single-byte range",
                base_name,
                metrics.widths.len(),
                metrics.first_char
            )));
        }
        Ok(Self {
            base_name,
            program,
            metrics,
        })
    }

    /// PostScript name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Size of the embedded program.
    pub fn program_len(&self) -> usize {
        self.program.len()
    }
}

/// A font a page can use.
#[derive(Debug, Clone)]
pub enum Font {
    /// One of the standard 14
    Standard(StandardFont),
    /// Embedded TrueType program, shared by identity
    TrueType(Rc<TrueTypeFont>),
}

impl From<StandardFont> for Font {
    fn from(font: StandardFont) -> Self {
        Font::Standard(font)
    }
}

impl From<Rc<TrueTypeFont>> for Font {
    fn from(font: Rc<TrueTypeFont>) -> Self {
        Font::TrueType(font)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FontKey {
    Standard(StandardFont),
    Program(*const TrueTypeFont),
}

impl FontKey {
    fn of(font: &Font) -> Self {
        match font {
            Font::Standard(standard) => FontKey::Standard(*standard),
            Font::TrueType(program) => FontKey::Program(Rc::as_ptr(program)),
        }
    }
}

struct EmbeddedRefs {
    descriptor: ObjectRef,
    file: ObjectRef,
}

struct FontEntry {
    name: String,
    font: Font,
    obj: ObjectRef,
    embedded: Option<EmbeddedRefs>,
}

/// Fonts used by the document, in first-use order.
#[derive(Default)]
pub struct FontTable {
    entries: IndexMap<FontKey, FontEntry>,
    closed: bool,
}

impl FontTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name and font dictionary reference for `font`.
    ///
    /// The first use of a font allocates its objects (one for a standard
    /// font; font, descriptor and program for an embedded one).
    pub fn use_font(&mut self, writer: &FragmentWriter, font: &Font) -> Result<(String, ObjectRef)> {
        if self.closed {
            return Err(Error::illegal("font used after the font table was written"));
        }
        let key = FontKey::of(font);
        if let Some(entry) = self.entries.get(&key) {
            return Ok((entry.name.clone(), entry.obj));
        }
        let name = format!("F{}", self.entries.len() + 1);
        let obj = writer.next_ref();
        let embedded = match font {
            Font::Standard(_) => None,
            Font::TrueType(_) => Some(EmbeddedRefs {
                descriptor: writer.next_ref(),
                file: writer.next_ref(),
            }),
        };
        log::trace!("font {} registered as {}", name, obj);
        self.entries.insert(
            key,
            FontEntry {
                name: name.clone(),
                font: font.clone(),
                obj,
                embedded,
            },
        );
        Ok((name, obj))
    }

    /// Number of distinct fonts used.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no font has been used.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every registered font.
    pub fn close(&mut self, writer: &mut FragmentWriter) -> Result<()> {
        if self.closed {
            return Err(Error::illegal("font table written twice"));
        }
        self.closed = true;
        for entry in self.entries.values() {
            match (&entry.font, &entry.embedded) {
                (Font::Standard(font), _) => write_standard(writer, entry.obj, *font)?,
                (Font::TrueType(program), Some(refs)) => {
                    write_truetype(writer, entry.obj, refs, program)?
                },
                (Font::TrueType(_), None) => {
                    return Err(Error::illegal(format!("font {} has no descriptor", entry.name)))
                },
            }
        }
        log::debug!("fonts: {} written", self.entries.len());
        Ok(())
    }
}

fn write_standard(writer: &mut FragmentWriter, obj: ObjectRef, font: StandardFont) -> Result<()> {
    writer.start_object(obj)?;
    writer.start_hash()?;
    writer.write_name("Type")?;
    writer.write_name("Font")?;
    writer.write_name("Subtype")?;
    writer.write_name("Type1")?;
    writer.write_name("BaseFont")?;
    writer.write_name(font.base_name())?;
    if !font.is_symbolic() {
        writer.write_name("Encoding")?;
        writer.write_name("WinAnsiEncoding")?;
    }
    writer.end_hash()?;
    writer.end_object()
}

fn write_truetype(
    writer: &mut FragmentWriter,
    obj: ObjectRef,
    refs: &EmbeddedRefs,
    font: &TrueTypeFont,
) -> Result<()> {
    let metrics = &font.metrics;

    writer.start_object(obj)?;
    writer.start_hash()?;
    writer.write_name("Type")?;
    writer.write_name("Font")?;
    writer.write_name("Subtype")?;
    writer.write_name("TrueType")?;
    writer.write_name("BaseFont")?;
    writer.write_name(&font.base_name)?;
    if !metrics.widths.is_empty() {
        writer.write_name("FirstChar")?;
        writer.write_int(metrics.first_char as i64)?;
        writer.write_name("LastChar")?;
        writer.write_int(metrics.first_char as i64 + metrics.widths.len() as i64 - 1)?;
        writer.write_name("Widths")?;
        writer.start_array()?;
        for width in &metrics.widths {
            writer.write_int(*width as i64)?;
        }
        writer.end_array()?;
    }
    writer.write_name("Encoding")?;
    writer.write_name("WinAnsiEncoding")?;
    writer.write_name("FontDescriptor")?;
    writer.write_object_ref(refs.descriptor)?;
    writer.end_hash()?;
    writer.end_object()?;

    writer.start_object(refs.descriptor)?;
    writer.start_hash()?;
    writer.write_name("Type")?;
    writer.write_name("FontDescriptor")?;
    writer.write_name("FontName")?;
    writer.write_name(&font.base_name)?;
    writer.write_name("Flags")?;
    writer.write_int(metrics.flags as i64)?;
    writer.write_name("FontBBox")?;
    writer.start_array()?;
    for value in metrics.bbox {
        writer.write_int(value as i64)?;
    }
    writer.end_array()?;
    writer.write_name("ItalicAngle")?;
    writer.write_real(metrics.italic_angle as f64)?;
    writer.write_name("Ascent")?;
    writer.write_int(metrics.ascent as i64)?;
    writer.write_name("Descent")?;
    writer.write_int(metrics.descent as i64)?;
    writer.write_name("CapHeight")?;
    writer.write_int(metrics.cap_height as i64)?;
    writer.write_name("StemV")?;
    writer.write_int(metrics.stem_v as i64)?;
    writer.write_name("FontFile2")?;
    writer.write_object_ref(refs.file)?;
    writer.end_hash()?;
    writer.end_object()?;

    writer.start_object(refs.file)?;
    writer.start_hash()?;
    writer.write_name("Length1")?;
    writer.write_int(font.program.len() as i64)?;
    writer.begin_stream(StreamMode::Binary)?;
    writer.write_stream(&font.program)?;
    writer.end_stream()?;
    writer.end_object()
}
