//! io/output.rs
//!
//! Hessian 2.0 output stream.
//!
//! Design notes:
//! - `ObjectOutput` is the object-safe surface serializers write through; it
//!   owns the per-stream reference, class and type tables.
//! - Class definitions are written in three steps (`write_object_begin`,
//!   `write_class_field_length`, one `write_string` per field). The output
//!   records the names as they go by, so a later cached instance can be
//!   checked against the schema the reader actually received.
//! - The sink is wrapped in a `BufWriter`; nothing reaches it before
//!   `flush`, `close` or `into_inner`.

use std::io::{self, BufWriter, Write};
use std::time::Instant;
use byteorder::WriteBytesExt;
use tracing::{debug, trace};

use crate::codec;
use crate::config::{OutputConfig, SchemaMode};
use crate::constants::{tags, LIST_DIRECT, LIST_DIRECT_MAX, LIST_DIRECT_UNTYPED, OBJECT_DIRECT, OBJECT_DIRECT_MAX};
use crate::io::body::BytesOutputStream;
use crate::io::stream::StreamSink;
use crate::io::tables::{ClassSchema, ClassTable, ReferenceTable, TypeTable};
use crate::telemetry::{CountersSnapshot, Stage, StreamCounters, TelemetryTimer};
use crate::types::{ProtocolError, Result};
use crate::value::Value;

/// Outcome of `write_object_begin`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectBegin {
    /// `C type` was written; the caller must write the field count and
    /// names, then begin again.
    NewDefinition,
    /// The instance header for class index `n` was written; values follow.
    Cached(usize),
    /// `M type` was written; `(name, value)` pairs follow, then `Z`.
    Legacy,
}

/// Object-safe write surface used by serializers.
pub trait ObjectOutput {
    /// Register `value` for back-references. Returns `true` (after writing
    /// the back-reference) if it was already written on this stream.
    fn add_ref(&mut self, value: &Value) -> Result<bool>;

    /// Index of `value` if it was already registered.
    fn get_ref(&self, value: &Value) -> Option<usize>;

    fn write_ref(&mut self, index: usize) -> Result<()>;

    /// Give `old`'s reference index to `new`.
    fn replace_ref(&mut self, old: &Value, new: &Value) -> bool;

    fn write_object_begin(&mut self, type_name: &str) -> Result<ObjectBegin>;

    fn write_class_field_length(&mut self, len: usize) -> Result<()>;

    /// Schema the stream holds for class index `index`.
    fn class_schema(&self, index: usize) -> Option<&ClassSchema>;

    /// Toggle unshared mode; returns the previous setting. While unshared,
    /// `add_ref` consumes indexes but never deduplicates.
    fn set_unshared(&mut self, unshared: bool) -> bool;

    fn write_boolean(&mut self, v: bool) -> Result<()>;
    fn write_int(&mut self, v: i32) -> Result<()>;
    fn write_long(&mut self, v: i64) -> Result<()>;
    fn write_double(&mut self, v: f64) -> Result<()>;
    fn write_string(&mut self, v: &str) -> Result<()>;
    fn write_utc_date(&mut self, millis: i64) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;

    /// Write any value, recursing through containers and objects.
    fn write_object(&mut self, value: &Value) -> Result<()>;
}

/// Definition being written: header emitted, names still arriving.
struct PendingDefinition {
    index: usize,
    type_name: String,
    expected: Option<usize>,
    names: Vec<String>,
}

pub struct Hessian2Output<W: Write> {
    out: BufWriter<W>,
    refs: ReferenceTable,
    classes: ClassTable,
    types: TypeTable,
    pending: Option<PendingDefinition>,
    unshared: bool,
    depth: usize,
    counters: StreamCounters,
    timer: TelemetryTimer,
    config: OutputConfig,
    closed: bool,
}

impl<W: Write> Hessian2Output<W> {
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, OutputConfig::default())
    }

    pub fn with_config(sink: W, config: OutputConfig) -> Self {
        Self {
            out: BufWriter::with_capacity(config.buffer_size.max(1), sink),
            refs: ReferenceTable::new(),
            classes: ClassTable::default(),
            types: TypeTable::default(),
            pending: None,
            unshared: false,
            depth: 0,
            counters: StreamCounters::default(),
            timer: TelemetryTimer::new(),
            config,
            closed: false,
        }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn counters(&self) -> &StreamCounters {
        &self.counters
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot::from(&self.counters, &self.timer)
    }

    /// Forget back-references; class and type tables are kept.
    pub fn reset_references(&mut self) {
        self.refs.clear();
    }

    /// Forget every table, as if the stream had just been opened.
    pub fn reset(&mut self) {
        self.refs.clear();
        self.classes = ClassTable::default();
        self.types = TypeTable::default();
        self.pending = None;
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink.
    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|e| e.into_error())
    }

    pub fn sink(&self) -> &W {
        self.out.get_ref()
    }

    /// Begin a list. Returns `true` if the list is open-ended and must be
    /// closed with `write_list_end`.
    pub fn write_list_begin(&mut self, len: Option<usize>, type_name: Option<&str>) -> Result<bool> {
        match (len, type_name) {
            (Some(n), Some(t)) if n <= LIST_DIRECT_MAX => {
                self.out.write_u8(LIST_DIRECT + n as u8)?;
                self.write_type(t)?;
            }
            (Some(n), Some(t)) => {
                self.out.write_u8(tags::LIST_FIXED)?;
                self.write_type(t)?;
                codec::encode_int(&mut self.out, checked_len(n)?)?;
            }
            (Some(n), None) if n <= LIST_DIRECT_MAX => {
                self.out.write_u8(LIST_DIRECT_UNTYPED + n as u8)?;
            }
            (Some(n), None) => {
                self.out.write_u8(tags::LIST_FIXED_UNTYPED)?;
                codec::encode_int(&mut self.out, checked_len(n)?)?;
            }
            (None, Some(t)) => {
                self.out.write_u8(tags::LIST_VARIABLE)?;
                self.write_type(t)?;
            }
            (None, None) => self.out.write_u8(tags::LIST_VARIABLE_UNTYPED)?,
        }
        Ok(len.is_none())
    }

    pub fn write_list_end(&mut self) -> Result<()> {
        self.out.write_u8(tags::END)?;
        Ok(())
    }

    /// `H` for an untyped map, `M type` for a typed one.
    pub fn write_map_begin(&mut self, type_name: Option<&str>) -> Result<()> {
        match type_name {
            Some(t) => {
                self.out.write_u8(tags::MAP_TYPED)?;
                self.write_type(t)?;
            }
            None => self.out.write_u8(tags::MAP_UNTYPED)?,
        }
        Ok(())
    }

    /// `E method`: opens an envelope.
    pub fn start_envelope(&mut self, method: &str) -> Result<()> {
        self.out.write_u8(tags::ENVELOPE)?;
        codec::encode_string(&mut self.out, method)?;
        Ok(())
    }

    pub fn complete_envelope(&mut self) -> Result<()> {
        self.out.write_u8(tags::END)?;
        Ok(())
    }

    /// Stream raw bytes as binary chunks; `finish` hands the output back.
    pub fn into_body_stream(self) -> BytesOutputStream<W> {
        BytesOutputStream::new(self)
    }

    pub(crate) fn sink_mut(&mut self) -> &mut BufWriter<W> {
        &mut self.out
    }

    fn write_type(&mut self, type_name: &str) -> Result<()> {
        match self.types.lookup_or_insert(type_name) {
            Some(index) => codec::encode_int(&mut self.out, index as i32)?,
            None => codec::encode_string(&mut self.out, type_name)?,
        }
        Ok(())
    }

    fn finish_definition(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(
                class = %pending.type_name,
                index = pending.index,
                fields = pending.names.len(),
                "class definition written"
            );
            self.classes.set_fields(pending.index, pending.names);
        }
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => codec::encode_null(&mut self.out)?,
            Value::Bool(v) => codec::encode_bool(&mut self.out, *v)?,
            Value::Int(v) => codec::encode_int(&mut self.out, *v)?,
            Value::Long(v) => codec::encode_long(&mut self.out, *v)?,
            Value::Double(v) => codec::encode_double(&mut self.out, *v)?,
            Value::String(s) => codec::encode_string(&mut self.out, s)?,
            Value::Date(ms) => codec::encode_date(&mut self.out, *ms)?,
            Value::Binary(b) => codec::encode_binary(&mut self.out, b)?,
            Value::List(list) => {
                if self.add_ref(value)? {
                    return Ok(());
                }
                let items = list.items();
                self.write_list_begin(Some(items.len()), list.type_name())?;
                for item in items.iter() {
                    self.write_object(item)?;
                }
            }
            Value::Map(map) => {
                if self.add_ref(value)? {
                    return Ok(());
                }
                self.write_map_begin(map.type_name())?;
                for (k, v) in map.entries().iter() {
                    self.write_object(k)?;
                    self.write_object(v)?;
                }
                self.write_map_end()?;
            }
            Value::Object(obj) => {
                let serializer = obj.serializer()?;
                serializer.write_object(obj, self)?;
            }
        }
        Ok(())
    }
}

impl<W: StreamSink> Hessian2Output<W> {
    /// Flush, and close the sink if configured to. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.out.flush()?;
        if self.config.close_stream_on_close {
            self.out.get_mut().close()?;
        }
        self.timer.finish();
        Ok(())
    }
}

fn checked_len(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| ProtocolError::InvalidLength { kind: "list", len: n as i64 }.into())
}

impl<W: Write> ObjectOutput for Hessian2Output<W> {
    fn add_ref(&mut self, value: &Value) -> Result<bool> {
        if self.unshared {
            self.refs.skip();
            return Ok(false);
        }
        match self.refs.add(value) {
            Some(index) => {
                self.write_ref(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_ref(&self, value: &Value) -> Option<usize> {
        self.refs.get(value)
    }

    fn write_ref(&mut self, index: usize) -> Result<()> {
        trace!(index, "back-reference");
        codec::encode_ref(&mut self.out, index)?;
        self.counters.refs_written += 1;
        Ok(())
    }

    fn replace_ref(&mut self, old: &Value, new: &Value) -> bool {
        self.refs.replace(old, new)
    }

    fn write_object_begin(&mut self, type_name: &str) -> Result<ObjectBegin> {
        if let Some(pending) = &self.pending {
            return Err(ProtocolError::IncompleteDefinition {
                class: pending.type_name.clone(),
                expected: pending.expected.unwrap_or(0),
                written: pending.names.len(),
            }
            .into());
        }

        if self.config.schema_mode == SchemaMode::Legacy {
            self.write_map_begin(Some(type_name))?;
            self.counters.objects_written += 1;
            self.counters.legacy_objects += 1;
            return Ok(ObjectBegin::Legacy);
        }

        if let Some(index) = self.classes.lookup(type_name) {
            if index <= OBJECT_DIRECT_MAX {
                self.out.write_u8(OBJECT_DIRECT + index as u8)?;
            } else {
                self.out.write_u8(tags::OBJECT)?;
                codec::encode_int(&mut self.out, index as i32)?;
            }
            self.counters.objects_written += 1;
            return Ok(ObjectBegin::Cached(index));
        }

        let index = self.classes.define(type_name);
        self.out.write_u8(tags::CLASS_DEF)?;
        codec::encode_string(&mut self.out, type_name)?;
        self.pending = Some(PendingDefinition {
            index,
            type_name: type_name.to_string(),
            expected: None,
            names: Vec::new(),
        });
        self.counters.definitions_written += 1;
        Ok(ObjectBegin::NewDefinition)
    }

    fn write_class_field_length(&mut self, len: usize) -> Result<()> {
        codec::encode_int(&mut self.out, checked_len(len)?)?;
        if let Some(pending) = self.pending.as_mut() {
            pending.expected = Some(len);
            pending.names.reserve(len);
            if len == 0 {
                self.finish_definition();
            }
        }
        Ok(())
    }

    fn class_schema(&self, index: usize) -> Option<&ClassSchema> {
        self.classes.get(index)
    }

    fn set_unshared(&mut self, unshared: bool) -> bool {
        std::mem::replace(&mut self.unshared, unshared)
    }

    fn write_boolean(&mut self, v: bool) -> Result<()> {
        codec::encode_bool(&mut self.out, v)?;
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        codec::encode_int(&mut self.out, v)?;
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        codec::encode_long(&mut self.out, v)?;
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        codec::encode_double(&mut self.out, v)?;
        Ok(())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        codec::encode_string(&mut self.out, v)?;
        if let Some(pending) = self.pending.as_mut() {
            if let Some(expected) = pending.expected {
                pending.names.push(v.to_string());
                if pending.names.len() == expected {
                    self.finish_definition();
                }
            }
        }
        Ok(())
    }

    fn write_utc_date(&mut self, millis: i64) -> Result<()> {
        codec::encode_date(&mut self.out, millis)?;
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        codec::encode_null(&mut self.out)?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        codec::encode_binary(&mut self.out, data)?;
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.out.write_u8(tags::END)?;
        Ok(())
    }

    fn write_object(&mut self, value: &Value) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(ProtocolError::DepthExceeded { limit: self.config.max_depth }.into());
        }
        self.counters.values_written += 1;
        let started = (self.depth == 0).then(Instant::now);
        self.depth += 1;
        let result = self.write_value(value);
        self.depth -= 1;
        if let Some(started) = started {
            self.timer.add_stage_time(Stage::Write, started.elapsed());
        }
        result
    }
}
