//! ASCIIHexDecode filter.

use std::io::{self, Write};

use super::{StreamDecoder, StreamLayer};
use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const BYTES_PER_LINE: usize = 32;

/// Incremental hex encoder. Ends the data with `>`.
pub struct AsciiHexEncoder {
    inner: Box<dyn StreamLayer>,
    column: usize,
}

impl AsciiHexEncoder {
    /// Encode into `inner`.
    pub fn new(inner: Box<dyn StreamLayer>) -> Self {
        Self { inner, column: 0 }
    }
}

impl Write for AsciiHexEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() * 2 + buf.len() / BYTES_PER_LINE + 1);
        for &byte in buf {
            out.push(HEX_DIGITS[(byte >> 4) as usize]);
            out.push(HEX_DIGITS[(byte & 0x0F) as usize]);
            self.column += 1;
            if self.column == BYTES_PER_LINE {
                out.push(b'\n');
                self.column = 0;
            }
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StreamLayer for AsciiHexEncoder {
    fn finish(mut self: Box<Self>) -> io::Result<u64> {
        self.inner.write_all(b">")?;
        self.inner.finish()
    }
}

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut digits = input
            .iter()
            .take_while(|&&c| c != b'>')
            .filter(|c| !c.is_ascii_whitespace());

        while let Some(&high) = digits.next() {
            // An odd final digit is followed by an implicit 0
            let low = digits.next().copied().unwrap_or(b'0');
            let high = hex_value(high)?;
            let low = hex_value(low)?;
            output.push((high << 4) | low);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(Error::Decode(format!(
            "ASCIIHexDecode: invalid hex digit '{}'",
            digit as char
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::MemoryLayer;

    #[test]
    fn test_encode_terminates_with_marker() {
        let (layer, handle) = MemoryLayer::new();
        let mut encoder = Box::new(AsciiHexEncoder::new(Box::new(layer)));
        encoder.write_all(&[0x00, 0xAB, 0xFF]).unwrap();
        let written = encoder.finish().unwrap();
        assert_eq!(*handle.borrow(), b"00ABFF>");
        assert_eq!(written, 7);
    }

    #[test]
    fn test_decode_lowercase_and_whitespace() {
        let decoded = AsciiHexDecoder.decode(b"48 65\n6c6C 6f>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_decode_odd_digit_count() {
        assert_eq!(AsciiHexDecoder.decode(b"7>").unwrap(), vec![0x70]);
    }

    #[test]
    fn test_decode_invalid_digit() {
        let err = AsciiHexDecoder.decode(b"4G>").unwrap_err();
        assert!(format!("{}", err).contains("invalid hex digit"));
    }
}
