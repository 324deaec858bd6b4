//! ASCII85Decode filter.
//!
//! Four bytes become five characters in `!`..`u`; an all-zero group becomes
//! `z`. A final group of n bytes becomes n + 1 characters, and `~>` ends the
//! data.

use std::io::{self, Write};

use super::{StreamDecoder, StreamLayer};
use crate::error::{Error, Result};

const LINE_WIDTH: usize = 75;

/// Incremental ASCII85 encoder.
pub struct Ascii85Encoder {
    inner: Box<dyn StreamLayer>,
    group: [u8; 4],
    filled: usize,
    column: usize,
}

impl Ascii85Encoder {
    /// Encode into `inner`.
    pub fn new(inner: Box<dyn StreamLayer>) -> Self {
        Self {
            inner,
            group: [0; 4],
            filled: 0,
            column: 0,
        }
    }

    fn encode_group(&mut self, len: usize, out: &mut Vec<u8>) {
        let mut padded = [0u8; 4];
        padded[..len].copy_from_slice(&self.group[..len]);
        let mut value = u32::from_be_bytes(padded);

        if len == 4 && value == 0 {
            out.push(b'z');
            self.column += 1;
        } else {
            let mut digits = [0u8; 5];
            for digit in digits.iter_mut().rev() {
                *digit = (value % 85) as u8 + b'!';
                value /= 85;
            }
            out.extend_from_slice(&digits[..len + 1]);
            self.column += len + 1;
        }

        if self.column >= LINE_WIDTH {
            out.push(b'\n');
            self.column = 0;
        }
    }
}

impl Write for Ascii85Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() * 5 / 4 + 8);
        for &byte in buf {
            self.group[self.filled] = byte;
            self.filled += 1;
            if self.filled == 4 {
                self.encode_group(4, &mut out);
                self.filled = 0;
            }
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StreamLayer for Ascii85Encoder {
    fn finish(mut self: Box<Self>) -> io::Result<u64> {
        let mut out = Vec::with_capacity(8);
        if self.filled > 0 {
            let len = self.filled;
            self.encode_group(len, &mut out);
        }
        out.extend_from_slice(b"~>");
        self.inner.write_all(&out)?;
        self.inner.finish()
    }
}

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut acc: u32 = 0;
        let mut count = 0;

        for &byte in input {
            match byte {
                b'~' => break,
                b'z' => {
                    if count != 0 {
                        return Err(Error::Decode(
                            "ASCII85Decode: 'z' inside a group".to_string(),
                        ));
                    }
                    output.extend_from_slice(&[0, 0, 0, 0]);
                },
                b'!'..=b'u' => {
                    acc = acc
                        .checked_mul(85)
                        .and_then(|v| v.checked_add((byte - b'!') as u32))
                        .ok_or_else(|| Error::Decode("ASCII85Decode: group overflow".to_string()))?;
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&acc.to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                _ if byte.is_ascii_whitespace() => {},
                _ => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character '{}'",
                        byte as char
                    )));
                },
            }
        }

        if count == 1 {
            return Err(Error::Decode("ASCII85Decode: dangling single character".to_string()));
        }
        if count > 1 {
            for _ in count..5 {
                acc = acc
                    .checked_mul(85)
                    .and_then(|v| v.checked_add(84))
                    .ok_or_else(|| Error::Decode("ASCII85Decode: padding overflow".to_string()))?;
            }
            output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}
