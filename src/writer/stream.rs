//! Stream bodies.

use std::io::{self, Write};

use super::FragmentWriter;
use crate::error::Result;
use crate::filters::StreamLayer;
use crate::sink::FragmentOutput;

/// Bottom stage of every stream chain: the writer's own fragment.
pub(crate) struct FragmentLayer {
    output: FragmentOutput,
    written: u64,
}

impl FragmentLayer {
    pub(crate) fn new(output: FragmentOutput) -> Self {
        Self { output, written: 0 }
    }
}

impl Write for FragmentLayer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

impl StreamLayer for FragmentLayer {
    fn finish(self: Box<Self>) -> io::Result<u64> {
        Ok(self.written)
    }
}

/// A stream whose body is being written.
pub(crate) struct OpenStream {
    pub(crate) chain: Box<dyn StreamLayer>,
    /// Reserved slot for the `/Length` value.
    pub(crate) length: FragmentWriter,
}

/// Byte sink for a stream body returned by [`FragmentWriter::start_stream`].
///
/// [`finish`](StreamWriter::finish) ends the stream and reports the encoded
/// length. Dropping the sink ends the stream too, logging any failure.
#[must_use = "the stream stays open until the writer is finished or dropped"]
pub struct StreamWriter<'a> {
    writer: &'a mut FragmentWriter,
    finished: bool,
}

impl<'a> StreamWriter<'a> {
    pub(crate) fn new(writer: &'a mut FragmentWriter) -> Self {
        Self {
            writer,
            finished: false,
        }
    }

    /// Write body bytes.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_stream(data)
    }

    /// End the stream. Returns the number of bytes between `stream` and `endstream`.
    pub fn finish(mut self) -> Result<u64> {
        self.finished = true;
        self.writer.end_stream()
    }
}

impl Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write_stream(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for StreamWriter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.writer.end_stream() {
            self.writer
                .context()
                .mark_broken(format!("failed to end stream on drop: {}", e));
        }
    }
}
