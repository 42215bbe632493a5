//! io/body.rs
//! Raw byte bodies carried as a sequence of binary chunks.
//!
//! The writer cannot know the body length up front, so it emits full
//! `A` chunks as they fill and a final `B` chunk (possibly empty) on
//! `finish`. The reader accepts any chunk forms the grammar allows.

use std::cmp::min;
use std::io::{self, Read, Write};

use crate::codec;
use crate::constants::BINARY_CHUNK_BYTES;
use crate::io::input::Hessian2Input;
use crate::io::output::Hessian2Output;
use crate::types::Result;

pub struct BytesOutputStream<W: Write> {
    out: Hessian2Output<W>,
    buf: Vec<u8>,
}

impl<W: Write> BytesOutputStream<W> {
    pub(crate) fn new(out: Hessian2Output<W>) -> Self {
        Self { out, buf: Vec::with_capacity(BINARY_CHUNK_BYTES) }
    }

    /// Write the final chunk and hand the output back.
    pub fn finish(mut self) -> io::Result<Hessian2Output<W>> {
        codec::encode_binary_chunk(self.out.sink_mut(), &self.buf, true)?;
        self.buf.clear();
        Ok(self.out)
    }
}

impl<W: Write> Write for BytesOutputStream<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.buf.len() == BINARY_CHUNK_BYTES {
            codec::encode_binary_chunk(self.out.sink_mut(), &self.buf, false)?;
            self.buf.clear();
        }
        let n = min(data.len(), BINARY_CHUNK_BYTES - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    /// Pushes buffered sink bytes; a partial chunk stays pending.
    fn flush(&mut self) -> io::Result<()> {
        self.out.sink_mut().flush()
    }
}

pub struct BytesInputStream<R: Read> {
    input: Hessian2Input<R>,
    remaining: usize,
    last: bool,
}

impl<R: Read> BytesInputStream<R> {
    /// Reads the first chunk header.
    pub(crate) fn new(mut input: Hessian2Input<R>) -> Result<Self> {
        let source = input.source_mut();
        let mut tag = [0u8; 1];
        source.read_exact(&mut tag)?;
        let (remaining, last) = codec::binary_chunk(tag[0], source)?;
        Ok(Self { input, remaining, last })
    }

    /// Drain whatever is left of the body and hand the input back.
    pub fn finish(mut self) -> Result<Hessian2Input<R>> {
        io::copy(&mut self, &mut io::sink())?;
        Ok(self.input)
    }
}

impl<R: Read> Read for BytesInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.remaining == 0 {
            if self.last {
                return Ok(0);
            }
            let source = self.input.source_mut();
            let mut tag = [0u8; 1];
            source.read_exact(&mut tag)?;
            let (len, last) = codec::binary_chunk(tag[0], source)?;
            self.remaining = len;
            self.last = last;
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let want = min(buf.len(), self.remaining);
        let n = self.input.source_mut().read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "binary chunk truncated"));
        }
        self.remaining -= n;
        Ok(n)
    }
}
