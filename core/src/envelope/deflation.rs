//! envelope/deflation.rs
//!
//! Deflation envelope: a nested Hessian stream, zlib-compressed, carried as
//! the binary body of an `E` frame.
//!
//! Frame: `E "com.caucho.hessian.io.Deflation" 0 <binary chunks> 0 Z`.
//!
//! Design notes:
//! - The compressor writes straight into the body stream, which emits a
//!   binary chunk each time 32 KiB accumulate.
//! - `close` finishes the compressor, the body and the frame, then closes
//!   the outer output. It runs once; later calls are no-ops.
//! - The reader drains whatever the inflater left unread before checking the
//!   footer, so a caller may stop reading the nested stream early.

use std::io::{self, Read, Write};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use tracing::debug;

use crate::config::DeflationConfig;
use crate::constants::DEFLATION_ENVELOPE;
use crate::envelope::{Envelope, EnvelopeError};
use crate::io::{
    BytesInputStream, BytesOutputStream, Hessian2Input, Hessian2Output, ObjectInput, ObjectOutput,
    StreamSink, StreamSource,
};
use crate::telemetry::{Stage, TelemetryTimer};
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct Deflation {
    config: DeflationConfig,
}

impl Deflation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DeflationConfig) -> Self {
        Self { config }
    }

    fn level(&self) -> Compression {
        match self.config.level {
            0..=9 => Compression::new(self.config.level),
            _ => Compression::default(),
        }
    }
}

impl Envelope for Deflation {
    type Writer<W: StreamSink> = DeflateOutputStream<W>;
    type Reader<R: StreamSource> = DeflateInputStream<R>;

    fn name(&self) -> &str {
        DEFLATION_ENVELOPE
    }

    fn wrap<W: StreamSink>(&self, mut out: Hessian2Output<W>) -> Result<DeflateOutputStream<W>> {
        out.start_envelope(self.name())?;
        out.write_int(0)?;
        debug!(envelope = self.name(), level = self.config.level, "envelope opened for writing");
        let body = out.into_body_stream();
        Ok(DeflateOutputStream {
            encoder: Some(ZlibEncoder::new(body, self.level())),
            finished: None,
            failure: None,
            timer: TelemetryTimer::new(),
        })
    }

    fn unwrap<R: StreamSource>(&self, mut input: Hessian2Input<R>) -> Result<DeflateInputStream<R>> {
        input.read_envelope()?;
        let method = input.read_method()?;
        if method != self.name() {
            return Err(EnvelopeError::MethodMismatch {
                expected: self.name().to_string(),
                found: method,
            }
            .into());
        }
        self.unwrap_headers(input)
    }

    fn unwrap_headers<R: StreamSource>(&self, mut input: Hessian2Input<R>) -> Result<DeflateInputStream<R>> {
        let headers = input.read_int()?;
        if headers != 0 {
            return Err(EnvelopeError::UnexpectedHeaders { count: headers }.into());
        }
        debug!(envelope = self.name(), "envelope opened for reading");
        let body = input.into_body_stream()?;
        Ok(DeflateInputStream {
            decoder: Some(ZlibDecoder::new(body)),
            finished: None,
            failure: None,
            timer: TelemetryTimer::new(),
        })
    }
}

/// Write side of a Deflation envelope. Bytes written here are the nested
/// stream; wrap it in its own `Hessian2Output`.
pub struct DeflateOutputStream<W: StreamSink> {
    encoder: Option<ZlibEncoder<BytesOutputStream<W>>>,
    finished: Option<Hessian2Output<W>>,
    failure: Option<EnvelopeError>,
    timer: TelemetryTimer,
}

impl<W: StreamSink> DeflateOutputStream<W> {
    pub fn timer(&self) -> &TelemetryTimer {
        &self.timer
    }

    pub fn is_closed(&self) -> bool {
        self.encoder.is_none()
    }

    /// Finish the compressed body, write the footer count and `Z`, and close
    /// the outer output. Idempotent; a failure is reported by every later
    /// call too.
    pub fn close(&mut self) -> Result<()> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let out = Self::close_frame(encoder).map_err(|e| {
            self.failure = Some(EnvelopeError::remembered(&e));
            e
        })?;
        self.timer.finish();
        debug!(
            envelope = DEFLATION_ENVELOPE,
            deflate_us = self.timer.stage_times.get_us(Stage::Deflate),
            "envelope closed"
        );
        self.finished = Some(out);
        Ok(())
    }

    fn close_frame(encoder: ZlibEncoder<BytesOutputStream<W>>) -> Result<Hessian2Output<W>> {
        let body = encoder.finish()?;
        let mut out = body.finish()?;
        out.write_int(0)?;
        out.complete_envelope()?;
        out.close()?;
        Ok(out)
    }

    /// Close and hand back the outer output.
    pub fn finish(mut self) -> Result<Hessian2Output<W>> {
        self.close()?;
        self.finished.take().ok_or_else(|| EnvelopeError::Closed.into())
    }
}

impl<W: StreamSink> Write for DeflateOutputStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let encoder = self.encoder.as_mut().ok_or_else(closed_error)?;
        self.timer.measure(Stage::Deflate, || encoder.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl<W: StreamSink> StreamSink for DeflateOutputStream<W> {
    fn close(&mut self) -> io::Result<()> {
        DeflateOutputStream::close(self).map_err(Into::into)
    }
}

impl<W: StreamSink> Drop for DeflateOutputStream<W> {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            if let Err(e) = DeflateOutputStream::close(self) {
                debug!(error = %e, "envelope close on drop failed");
            }
        }
    }
}

/// Read side of a Deflation envelope. Bytes read here are the nested
/// stream; wrap it in its own `Hessian2Input`.
pub struct DeflateInputStream<R: StreamSource> {
    decoder: Option<ZlibDecoder<BytesInputStream<R>>>,
    finished: Option<Hessian2Input<R>>,
    failure: Option<EnvelopeError>,
    timer: TelemetryTimer,
}

impl<R: StreamSource> DeflateInputStream<R> {
    pub fn timer(&self) -> &TelemetryTimer {
        &self.timer
    }

    pub fn is_closed(&self) -> bool {
        self.decoder.is_none()
    }

    /// Drain the body, check the footer count and `Z`, and close the outer
    /// input. Idempotent; a failure is reported by every later call too.
    pub fn close(&mut self) -> Result<()> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }
        let Some(decoder) = self.decoder.take() else {
            return Ok(());
        };
        let input = Self::close_frame(decoder).map_err(|e| {
            self.failure = Some(EnvelopeError::remembered(&e));
            e
        })?;
        self.timer.finish();
        debug!(envelope = DEFLATION_ENVELOPE, "envelope closed after reading");
        self.finished = Some(input);
        Ok(())
    }

    fn close_frame(decoder: ZlibDecoder<BytesInputStream<R>>) -> Result<Hessian2Input<R>> {
        let mut input = decoder.into_inner().finish()?;
        let footers = input.read_int()?;
        if footers != 0 {
            return Err(EnvelopeError::UnexpectedFooters { count: footers }.into());
        }
        input.complete_envelope()?;
        input.close()?;
        Ok(input)
    }

    /// Close and hand back the outer input.
    pub fn finish(mut self) -> Result<Hessian2Input<R>> {
        self.close()?;
        self.finished.take().ok_or_else(|| EnvelopeError::Closed.into())
    }
}

impl<R: StreamSource> Read for DeflateInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let decoder = self.decoder.as_mut().ok_or_else(closed_error)?;
        self.timer.measure(Stage::Inflate, || decoder.read(buf))
    }
}

impl<R: StreamSource> StreamSource for DeflateInputStream<R> {
    fn close(&mut self) -> io::Result<()> {
        DeflateInputStream::close(self).map_err(Into::into)
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "envelope stream is closed")
}
