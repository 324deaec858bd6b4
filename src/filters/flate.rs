//! FlateDecode filter (zlib).

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::{StreamDecoder, StreamLayer};
use crate::error::{Error, Result};

/// Incremental zlib encoder.
pub struct FlateEncoder {
    encoder: ZlibEncoder<Box<dyn StreamLayer>>,
}

impl FlateEncoder {
    /// Compress into `inner` at the default level.
    pub fn new(inner: Box<dyn StreamLayer>) -> Self {
        Self {
            encoder: ZlibEncoder::new(inner, flate2::Compression::default()),
        }
    }
}

impl Write for FlateEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl StreamLayer for FlateEncoder {
    fn finish(self: Box<Self>) -> io::Result<u64> {
        let inner = self.encoder.finish()?;
        inner.finish()
    }
}

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(input);
        let mut output = Vec::new();
        decoder
            .read_to_end(&mut output)
            .map_err(|e| Error::Decode(format!("FlateDecode: {}", e)))?;
        Ok(output)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}
