//! Stream filters.
//!
//! A stream's `/Filter` entry and the encoder chain its body is written
//! through both come from [`filter_chain`]. The array lists filters in
//! decoding order, so the encoder nearest the caller is the last entry and
//! the one nearest the file is the first.

use std::io::{self, Write};

use crate::config::Compression;
use crate::error::Result;

mod ascii85;
mod ascii_hex;
mod flate;

pub use ascii85::{Ascii85Decoder, Ascii85Encoder};
pub use ascii_hex::{AsciiHexDecoder, AsciiHexEncoder};
pub use flate::{FlateDecoder, FlateEncoder};

/// One stage of a stream's encoding chain.
///
/// Stages own the stage below them. Finishing a stage writes any trailer it
/// needs and finishes the stage below; the result is the number of bytes
/// that reached the fragment.
pub trait StreamLayer: Write {
    /// Flush pending state and finish every stage below.
    fn finish(self: Box<Self>) -> io::Result<u64>;
}

/// Decoder for one filter.
pub trait StreamDecoder {
    /// Decode a complete stream body.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as written in `/Filter`.
    fn name(&self) -> &str;
}

/// What kind of bytes a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Text-safe data such as content streams
    Ascii,
    /// Opaque data such as font programs and image samples
    Binary,
    /// Data already encoded by the caller; never filtered
    Raw,
}

/// Standard filters the writer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Two hex digits per byte
    AsciiHex,
    /// Base-85, four bytes to five characters
    Ascii85,
    /// zlib/deflate
    Flate,
}

impl Filter {
    /// Name written in the `/Filter` entry.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Filter::AsciiHex => "ASCIIHexDecode",
            Filter::Ascii85 => "ASCII85Decode",
            Filter::Flate => "FlateDecode",
        }
    }

    /// Wrap `inner` with this filter's encoder.
    pub fn encoder(&self, inner: Box<dyn StreamLayer>) -> Box<dyn StreamLayer> {
        match self {
            Filter::AsciiHex => Box::new(AsciiHexEncoder::new(inner)),
            Filter::Ascii85 => Box::new(Ascii85Encoder::new(inner)),
            Filter::Flate => Box::new(FlateEncoder::new(inner)),
        }
    }

    /// Decode a complete body encoded with this filter.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Filter::AsciiHex => AsciiHexDecoder.decode(data),
            Filter::Ascii85 => Ascii85Decoder.decode(data),
            Filter::Flate => FlateDecoder.decode(data),
        }
    }
}

const NO_FILTERS: &[Filter] = &[];
const HEX: &[Filter] = &[Filter::AsciiHex];
const ASCII85_FLATE: &[Filter] = &[Filter::Ascii85, Filter::Flate];
const FLATE: &[Filter] = &[Filter::Flate];

/// Rows: stream mode. Columns: compression None, Ascii, Binary.
const FILTER_TABLE: [[&[Filter]; 3]; 3] = [
    [NO_FILTERS, ASCII85_FLATE, FLATE],
    [HEX, ASCII85_FLATE, FLATE],
    [NO_FILTERS, NO_FILTERS, NO_FILTERS],
];

/// Filters for a stream, in `/Filter` (decoding) order.
pub fn filter_chain(mode: StreamMode, compression: Compression) -> &'static [Filter] {
    let row = match mode {
        StreamMode::Ascii => 0,
        StreamMode::Binary => 1,
        StreamMode::Raw => 2,
    };
    let column = match compression {
        Compression::None => 0,
        Compression::Ascii => 1,
        Compression::Binary => 2,
    };
    FILTER_TABLE[row][column]
}

/// Build the encoder chain for `filters` on top of `sink`.
pub fn encoder_chain(filters: &[Filter], sink: Box<dyn StreamLayer>) -> Box<dyn StreamLayer> {
    filters
        .iter()
        .fold(sink, |inner, filter| filter.encoder(inner))
}

/// Decode a stream body through `filters` in `/Filter` order.
pub fn decode_stream(data: &[u8], filters: &[Filter]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for filter in filters {
        current = filter.decode(&current)?;
    }
    Ok(current)
}

/// Innermost layer that collects into memory. Used by tests and by callers
/// that need an encoded body up front.
#[derive(Debug, Default)]
pub struct MemoryLayer {
    buffer: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
}

impl MemoryLayer {
    /// Create a layer and a handle to read its contents afterwards.
    pub fn new() -> (Self, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        let layer = Self::default();
        let handle = layer.buffer.clone();
        (layer, handle)
    }
}

impl Write for MemoryLayer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StreamLayer for MemoryLayer {
    fn finish(self: Box<Self>) -> io::Result<u64> {
        Ok(self.buffer.borrow().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(filters: &[Filter], data: &[u8]) -> Vec<u8> {
        let (layer, handle) = MemoryLayer::new();
        let mut chain = encoder_chain(filters, Box::new(layer));
        chain.write_all(data).unwrap();
        let written = chain.finish().unwrap();
        let out = handle.borrow().clone();
        assert_eq!(written as usize, out.len());
        out
    }

    #[test]
    fn test_table_matches_modes() {
        assert!(filter_chain(StreamMode::Ascii, Compression::None).is_empty());
        assert_eq!(
            filter_chain(StreamMode::Binary, Compression::None),
            &[Filter::AsciiHex]
        );
        assert_eq!(
            filter_chain(StreamMode::Ascii, Compression::Ascii),
            &[Filter::Ascii85, Filter::Flate]
        );
        assert_eq!(
            filter_chain(StreamMode::Binary, Compression::Binary),
            &[Filter::Flate]
        );
        for compression in [Compression::None, Compression::Ascii, Compression::Binary] {
            assert!(filter_chain(StreamMode::Raw, compression).is_empty());
        }
    }

    #[test]
    fn test_every_chain_decodes_back() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
        for mode in [StreamMode::Ascii, StreamMode::Binary, StreamMode::Raw] {
            for compression in [Compression::None, Compression::Ascii, Compression::Binary] {
                let filters = filter_chain(mode, compression);
                let encoded = encode(filters, &data);
                let decoded = decode_stream(&encoded, filters).unwrap();
                assert_eq!(decoded, data, "{:?}/{:?}", mode, compression);
            }
        }
    }

    #[test]
    fn test_ascii_chains_are_seven_bit_clean() {
        let data: Vec<u8> = (0..=255u8).collect();
        for filters in [HEX, ASCII85_FLATE] {
            let encoded = encode(filters, &data);
            assert!(encoded.iter().all(|b| b.is_ascii()));
        }
    }

    #[test]
    fn test_pdf_names() {
        assert_eq!(Filter::Flate.pdf_name(), "FlateDecode");
        assert_eq!(Filter::Ascii85.pdf_name(), "ASCII85Decode");
        assert_eq!(Filter::AsciiHex.pdf_name(), "ASCIIHexDecode");
    }
}
