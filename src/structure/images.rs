//! Image XObjects.
//!
//! Images are memoised by source: a URI is loaded and embedded once, and a
//! shared [`ImageData`] buffer is embedded once per allocation however many
//! pages draw it. The XObject (and its soft mask) is written the first time
//! the image is used.

use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::PdfVersion;
use crate::error::{Error, Result};
use crate::filters::StreamMode;
use crate::object::ObjectRef;
use crate::writer::FragmentWriter;

/// Color space of image samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// One component
    DeviceGray,
    /// Red, green, blue
    DeviceRGB,
    /// Cyan, magenta, yellow, black
    DeviceCMYK,
}

impl ColorSpace {
    /// Components per sample.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }

    /// PDF name.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// How the image bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Uncompressed samples, row by row; compressed with the document's policy
    Samples,
    /// A complete JPEG file, embedded as is
    Jpeg,
}

/// An image ready to embed.
#[derive(Debug, Clone)]
pub struct ImageData {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: ColorSpace,
    encoding: ImageEncoding,
    data: Vec<u8>,
    /// 8-bit alpha samples
    soft_mask: Option<Vec<u8>>,
}

impl ImageData {
    /// Raw samples. Rows are padded to a whole byte.
    pub fn new(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        bits_per_component: u8,
        data: Vec<u8>,
    ) -> Result<Self> {
        if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
            return Err(Error::Image(format!(
                "unsupported bits per component: {}",
                bits_per_component
            )));
        }
        if width == 0 || height == 0 {
            return Err(Error::Image(format!("empty image {}x{}", width, height)));
        }
        let row_bits = width as u64 * color_space.components() as u64 * bits_per_component as u64;
        let expected = row_bits.div_ceil(8) * height as u64;
        if data.len() as u64 != expected {
            return Err(Error::Image(format!(
                "{}x{} {} image at {} bits needs {} bytes, got {}",
                width,
                height,
                color_space.pdf_name(),
                bits_per_component,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits_per_component,
            color_space,
            encoding: ImageEncoding::Samples,
            data,
            soft_mask: None,
        })
    }

    /// A JPEG file; dimensions and color space come from its frame header.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;
        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            encoding: ImageEncoding::Jpeg,
            data,
            soft_mask: None,
        })
    }

    /// A PNG file, decoded to samples. Alpha becomes a soft mask.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        use image::GenericImageView;

        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| Error::Image(format!("failed to decode PNG: {}", e)))?;
        let (width, height) = img.dimensions();

        let (color_space, pixels, alpha) = match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => {
                (ColorSpace::DeviceGray, img.to_luma8().into_raw(), None)
            },
            image::ColorType::La8 | image::ColorType::La16 => {
                let gray_alpha = img.to_luma_alpha8();
                let mut gray = Vec::with_capacity((width * height) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in gray_alpha.pixels() {
                    gray.push(pixel.0[0]);
                    alpha.push(pixel.0[1]);
                }
                (ColorSpace::DeviceGray, gray, Some(alpha))
            },
            image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }
                (ColorSpace::DeviceRGB, rgb, Some(alpha))
            },
            _ => (ColorSpace::DeviceRGB, img.to_rgb8().into_raw(), None),
        };

        let mut image = Self::new(width, height, color_space, 8, pixels)?;
        // Fully opaque alpha adds nothing
        image.soft_mask = alpha.filter(|alpha| alpha.iter().any(|&a| a != 0xFF));
        Ok(image)
    }

    /// JPEG or PNG, by signature.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.starts_with(&[0xFF, 0xD8]) {
            return Self::from_jpeg(data.to_vec());
        }
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Self::from_png(data);
        }
        Err(Error::Image("unsupported image format".to_string()))
    }

    /// Load a JPEG or PNG file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Attach 8-bit alpha samples, one per pixel.
    pub fn with_soft_mask(mut self, alpha: Vec<u8>) -> Result<Self> {
        let expected = self.width as u64 * self.height as u64;
        if alpha.len() as u64 != expected {
            return Err(Error::Image(format!(
                "soft mask needs {} bytes, got {}",
                expected,
                alpha.len()
            )));
        }
        self.soft_mask = Some(alpha);
        Ok(self)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color space.
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Storage of the image bytes.
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// Whether a soft mask will be written.
    pub fn has_soft_mask(&self) -> bool {
        self.soft_mask.is_some()
    }

    fn write(&self, writer: &mut FragmentWriter, obj: ObjectRef) -> Result<()> {
        let mask = self.soft_mask.as_ref().map(|_| writer.next_ref());

        writer.start_object(obj)?;
        writer.start_hash()?;
        write_image_header(writer, self.width, self.height, self.color_space, self.bits_per_component)?;
        if let Some(mask) = mask {
            writer.write_name("SMask")?;
            writer.write_object_ref(mask)?;
        }
        let mode = match self.encoding {
            ImageEncoding::Samples => StreamMode::Binary,
            ImageEncoding::Jpeg => {
                writer.write_name("Filter")?;
                writer.write_name("DCTDecode")?;
                StreamMode::Raw
            },
        };
        writer.begin_stream(mode)?;
        writer.write_stream(&self.data)?;
        writer.end_stream()?;
        writer.end_object()?;

        if let (Some(mask), Some(alpha)) = (mask, &self.soft_mask) {
            writer.start_object(mask)?;
            writer.start_hash()?;
            write_image_header(writer, self.width, self.height, ColorSpace::DeviceGray, 8)?;
            writer.begin_stream(StreamMode::Binary)?;
            writer.write_stream(alpha)?;
            writer.end_stream()?;
            writer.end_object()?;
        }
        log::trace!("image {} ({}x{}) written", obj, self.width, self.height);
        Ok(())
    }
}

fn write_image_header(
    writer: &mut FragmentWriter,
    width: u32,
    height: u32,
    color_space: ColorSpace,
    bits: u8,
) -> Result<()> {
    writer.write_name("Type")?;
    writer.write_name("XObject")?;
    writer.write_name("Subtype")?;
    writer.write_name("Image")?;
    writer.write_name("Width")?;
    writer.write_int(width as i64)?;
    writer.write_name("Height")?;
    writer.write_int(height as i64)?;
    writer.write_name("ColorSpace")?;
    writer.write_name(color_space.pdf_name())?;
    writer.write_name("BitsPerComponent")?;
    writer.write_int(bits as i64)
}

/// Parse the JPEG frame header for dimensions and color space.
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace)> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(Error::Image("not a JPEG file".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        pos += 2;

        // Fill bytes and stuffed zeros
        if marker == 0xFF || marker == 0x00 {
            continue;
        }
        // Standalone markers carry no length
        if matches!(marker, 0x01 | 0xD0..=0xD7) {
            continue;
        }

        // SOF0..SOF15 except DHT, JPG and DAC
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            if pos + 8 > data.len() {
                return Err(Error::Image("truncated JPEG frame header".to_string()));
            }
            let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
            let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let color_space = match data[pos + 7] {
                1 => ColorSpace::DeviceGray,
                3 => ColorSpace::DeviceRGB,
                4 => ColorSpace::DeviceCMYK,
                n => return Err(Error::Image(format!("unsupported JPEG component count {}", n))),
            };
            if width == 0 || height == 0 {
                return Err(Error::Image("JPEG frame has no size".to_string()));
            }
            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }

    Err(Error::Image("JPEG frame header not found".to_string()))
}

/// Where an image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// File path or `file://` URI, loaded on first use
    Uri(String),
    /// In-memory image, memoised by allocation
    Buffer(Rc<ImageData>),
}

impl From<Rc<ImageData>> for ImageSource {
    fn from(image: Rc<ImageData>) -> Self {
        ImageSource::Buffer(image)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ImageKey {
    Uri(String),
    Buffer(*const ImageData),
}

struct ImageEntry {
    name: String,
    obj: ObjectRef,
    // Keeps the buffer address from being reused by another image
    _source: Option<Rc<ImageData>>,
}

/// Images embedded so far, in first-use order.
#[derive(Default)]
pub struct ImageTable {
    entries: IndexMap<ImageKey, ImageEntry>,
}

impl ImageTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name and XObject reference for `source`, embedding it on
    /// first use.
    pub fn use_image(
        &mut self,
        writer: &mut FragmentWriter,
        source: &ImageSource,
    ) -> Result<(String, ObjectRef)> {
        let key = match source {
            ImageSource::Uri(uri) => ImageKey::Uri(uri.clone()),
            ImageSource::Buffer(image) => ImageKey::Buffer(Rc::as_ptr(image)),
        };
        if let Some(entry) = self.entries.get(&key) {
            return Ok((entry.name.clone(), entry.obj));
        }

        let (image, keep) = match source {
            ImageSource::Uri(uri) => (Rc::new(load_uri(uri)?), None),
            ImageSource::Buffer(image) => (image.clone(), Some(image.clone())),
        };
        if image.has_soft_mask() {
            writer
                .version()
                .require(PdfVersion::V1_4, "soft-masked images")?;
        }
        let obj = writer.next_ref();
        image.write(writer, obj)?;

        let name = format!("Im{}", self.entries.len() + 1);
        self.entries.insert(
            key,
            ImageEntry {
                name: name.clone(),
                obj,
                _source: keep,
            },
        );
        Ok((name, obj))
    }

    /// Number of distinct images embedded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no image has been embedded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load_uri(uri: &str) -> Result<ImageData> {
    let path = match uri.split_once("://") {
        None => uri,
        Some(("file", path)) => path,
        Some((scheme, _)) => {
            return Err(Error::Image(format!("unsupported image URI scheme '{}'", scheme)))
        },
    };
    ImageData::from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::config::{Compression, WriterConfig};
    use crate::sink::{FragmentSink, SpoolSink};
    use crate::writer::WriterContext;

    /// Smallest useful baseline JPEG prefix: SOI, APP0 stub, SOF0 for 16x8 RGB.
    fn jpeg_stub() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x08, 0x00, 0x10, 0x03]);
        data.extend_from_slice(&[0u8; 9]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    fn writer(version: PdfVersion) -> (Rc<RefCell<SpoolSink<Vec<u8>>>>, FragmentWriter) {
        let sink = Rc::new(RefCell::new(SpoolSink::new(Vec::new())));
        let config = WriterConfig::new()
            .with_version(version)
            .with_compression(Compression::None);
        let context = WriterContext::new(sink.clone(), &config);
        (sink, FragmentWriter::new(context).unwrap())
    }

    fn output(sink: &Rc<RefCell<SpoolSink<Vec<u8>>>>) -> String {
        let mut sink = sink.borrow_mut();
        sink.finish().unwrap();
        String::from_utf8_lossy(&sink.take_output().unwrap()).into_owned()
    }

    #[test]
    fn test_parse_jpeg_header() {
        let image = ImageData::from_jpeg(jpeg_stub()).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
        assert_eq!(image.color_space(), ColorSpace::DeviceRGB);
        assert_eq!(image.encoding(), ImageEncoding::Jpeg);
        assert!(ImageData::from_jpeg(vec![0x89, b'P']).is_err());
        assert!(ImageData::from_bytes(b"GIF89a").is_err());
    }

    #[test]
    fn test_sample_length_checked() {
        assert!(ImageData::new(2, 2, ColorSpace::DeviceRGB, 8, vec![0; 12]).is_ok());
        assert!(ImageData::new(2, 2, ColorSpace::DeviceRGB, 8, vec![0; 11]).is_err());
        // 3 one-bit pixels pad to one byte per row
        assert!(ImageData::new(3, 2, ColorSpace::DeviceGray, 1, vec![0; 2]).is_ok());
        assert!(ImageData::new(1, 1, ColorSpace::DeviceGray, 3, vec![0]).is_err());
    }

    #[test]
    fn test_buffer_embedded_once() {
        let (sink, mut w) = writer(PdfVersion::V1_7);
        let image = Rc::new(ImageData::new(1, 1, ColorSpace::DeviceGray, 8, vec![0x7F]).unwrap());
        let mut table = ImageTable::new();
        let first = table.use_image(&mut w, &image.clone().into()).unwrap();
        let again = table.use_image(&mut w, &image.into()).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.0, "Im1");
        assert_eq!(table.len(), 1);
        w.close().unwrap();
        let text = output(&sink);
        assert_eq!(text.matches("/Subtype /Image").count(), 1);
        assert!(text.contains(
            "/Width 1 /Height 1 /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /ASCIIHexDecode /Length 3>>\nstream\n7F>\nendstream"
        ));
    }

    #[test]
    fn test_jpeg_passes_through() {
        let (sink, mut w) = writer(PdfVersion::V1_7);
        let image = Rc::new(ImageData::from_jpeg(jpeg_stub()).unwrap());
        let mut table = ImageTable::new();
        table.use_image(&mut w, &image.into()).unwrap();
        w.close().unwrap();
        let text = output(&sink);
        assert!(text.contains(&format!("/Filter /DCTDecode /Length {}>>", jpeg_stub().len())));
    }

    #[test]
    fn test_soft_mask() {
        let with_alpha = || {
            ImageData::new(2, 1, ColorSpace::DeviceRGB, 8, vec![0; 6])
                .unwrap()
                .with_soft_mask(vec![0, 255])
                .unwrap()
        };

        let (sink, mut w) = writer(PdfVersion::V1_4);
        let mut table = ImageTable::new();
        let (_, obj) = table.use_image(&mut w, &Rc::new(with_alpha()).into()).unwrap();
        w.close().unwrap();
        let text = output(&sink);
        assert_eq!(obj, ObjectRef::new(1, 0));
        assert!(text.contains("/SMask 2 0 R"));
        assert!(text.contains("2 0 obj\n<</Type /XObject /Subtype /Image /Width 2 /Height 1 /ColorSpace /DeviceGray"));

        let (sink, mut w) = writer(PdfVersion::V1_3);
        let mut table = ImageTable::new();
        let err = table.use_image(&mut w, &Rc::new(with_alpha()).into()).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        w.close().unwrap();
        assert!(output(&sink).is_empty());
    }

    #[test]
    fn test_png_with_alpha() {
        let mut png = Vec::new();
        let pixels = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128]).unwrap();
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let image = ImageData::from_bytes(&png).unwrap();
        assert_eq!(image.color_space(), ColorSpace::DeviceRGB);
        assert!(image.has_soft_mask());
    }

    #[test]
    fn test_uri_scheme_rejected() {
        let (_sink, mut w) = writer(PdfVersion::V1_7);
        let mut table = ImageTable::new();
        let source = ImageSource::Uri("https://example.com/a.png".to_string());
        assert!(matches!(table.use_image(&mut w, &source), Err(Error::Image(_))));
        w.close().unwrap();
    }
}
