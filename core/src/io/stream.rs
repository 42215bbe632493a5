//! io/stream.rs
//! Normalized byte sources and sinks for Hessian streams.
//!
//! `StreamSink` / `StreamSource` add an explicit `close` to `Write` / `Read`
//! so an envelope can finish its compressor and frame when the caller is
//! done, independent of drop order.

use std::fs::File;
use std::io::{self, Cursor, Read, Write};

/// A byte sink that can be closed explicitly.
pub trait StreamSink: Write {
    /// Flush and release the sink. Default: flush.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// A byte source that can be closed explicitly.
pub trait StreamSource: Read {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StreamSink for Vec<u8> {}
impl StreamSink for File {}
impl StreamSink for Cursor<Vec<u8>> {}
impl StreamSink for Box<dyn Write + Send> {}
impl<W: StreamSink + ?Sized> StreamSink for &mut W {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl StreamSource for &[u8] {}
impl StreamSource for File {}
impl<T: AsRef<[u8]>> StreamSource for Cursor<T> {}
impl StreamSource for Box<dyn Read + Send> {}
impl<R: StreamSource + ?Sized> StreamSource for &mut R {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
