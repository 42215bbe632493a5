//! io/input.rs
//!
//! Hessian 2.0 input stream.
//!
//! Design notes:
//! - `read_object` rebuilds a dynamic `Value` graph. Containers are
//!   registered before their children are read, so a child may refer back
//!   to its parent and cycles come out intact.
//! - Class instances and string-keyed typed maps become `GenericObject`s;
//!   other maps become `MapValue`s, keeping their type name if they had one.
//! - Nesting is bounded by `InputConfig::max_depth`.

use std::io::{BufRead, BufReader, Read};
use std::rc::Rc;
use std::time::Instant;
use byteorder::ReadBytesExt;
use tracing::{debug, trace};

use crate::codec;
use crate::config::InputConfig;
use crate::constants::{tags, LIST_DIRECT, LIST_DIRECT_UNTYPED, OBJECT_DIRECT};
use crate::io::body::BytesInputStream;
use crate::io::stream::StreamSource;
use crate::serializer::IteratorDeserializer;
use crate::telemetry::{CountersSnapshot, Stage, StreamCounters, TelemetryTimer};
use crate::types::{ProtocolError, Result};
use crate::value::{GenericObject, ListValue, MapValue, ObjectRef, Value};

/// Object-safe read surface used by deserializers.
pub trait ObjectInput {
    /// True at an end marker `Z` (or end of input).
    fn is_end(&mut self) -> Result<bool>;

    fn read_end(&mut self) -> Result<()>;

    fn read_map_end(&mut self) -> Result<()>;

    fn read_object(&mut self) -> Result<Value>;

    /// `None` for a null.
    fn read_string(&mut self) -> Result<Option<String>>;

    fn read_int(&mut self) -> Result<i32>;

    fn read_long(&mut self) -> Result<i64>;

    fn read_double(&mut self) -> Result<f64>;

    fn read_boolean(&mut self) -> Result<bool>;

    /// UTC millis; `None` for a null.
    fn read_utc_date(&mut self) -> Result<Option<i64>>;

    /// Register a value for back-references; returns its index.
    fn add_ref(&mut self, value: Value) -> usize;
}

/// Class definition as received: `C type count names...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDefinition {
    pub type_name: String,
    pub field_names: Vec<String>,
}

/// Header of a list: element type and, for fixed lists, the length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListHeader {
    pub type_name: Option<String>,
    pub length: Option<usize>,
}

pub struct Hessian2Input<R: Read> {
    input: BufReader<R>,
    refs: Vec<Value>,
    classes: Vec<Rc<ClassDefinition>>,
    types: Vec<String>,
    depth: usize,
    counters: StreamCounters,
    timer: TelemetryTimer,
    config: InputConfig,
    closed: bool,
}

impl<R: Read> Hessian2Input<R> {
    pub fn new(source: R) -> Self {
        Self::with_config(source, InputConfig::default())
    }

    pub fn with_config(source: R, config: InputConfig) -> Self {
        Self {
            input: BufReader::with_capacity(config.buffer_size.max(1), source),
            refs: Vec::new(),
            classes: Vec::new(),
            types: Vec::new(),
            depth: 0,
            counters: StreamCounters::default(),
            timer: TelemetryTimer::new(),
            config,
            closed: false,
        }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn counters(&self) -> &StreamCounters {
        &self.counters
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot::from(&self.counters, &self.timer)
    }

    pub fn reset_references(&mut self) {
        self.refs.clear();
    }

    /// Class definitions received so far, in index order.
    pub fn class_definitions(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.iter().map(|c| c.as_ref())
    }

    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }

    pub(crate) fn source_mut(&mut self) -> &mut BufReader<R> {
        &mut self.input
    }

    /// Next tag without consuming it; `None` at end of input.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self.input.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn read_tag(&mut self) -> Result<u8> {
        Ok(self.input.read_u8()?)
    }

    /// `E`, optionally preceded by an `H major minor` version header.
    /// Returns the version (`major << 16 | minor`, 0 when absent).
    pub fn read_envelope(&mut self) -> Result<u32> {
        let mut tag = self.read_tag()?;
        let mut version = 0u32;
        if tag == tags::MAP_UNTYPED {
            let major = self.input.read_u8()? as u32;
            let minor = self.input.read_u8()? as u32;
            version = (major << 16) | minor;
            tag = self.read_tag()?;
        }
        if tag != tags::ENVELOPE {
            return Err(ProtocolError::UnexpectedTag { expected: "envelope", tag }.into());
        }
        Ok(version)
    }

    /// Envelope method name following `read_envelope`.
    pub fn read_method(&mut self) -> Result<String> {
        let tag = self.read_tag()?;
        codec::decode_string(tag, &mut self.input)
    }

    pub fn complete_envelope(&mut self) -> Result<()> {
        self.read_end()
    }

    /// Stream a binary body; `finish` drains it and hands the input back.
    pub fn into_body_stream(self) -> Result<BytesInputStream<R>> {
        BytesInputStream::new(self)
    }

    /// Whole binary value; `None` for a null.
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let tag = self.read_tag()?;
        if tag == tags::NULL {
            return Ok(None);
        }
        codec::decode_binary(tag, &mut self.input).map(Some)
    }

    /// Type string or index into the type table.
    pub fn read_type(&mut self) -> Result<String> {
        let tag = self.read_tag()?;
        if codec::is_string_tag(tag) {
            let name = codec::decode_string(tag, &mut self.input)?;
            self.types.push(name.clone());
            return Ok(name);
        }
        let index = self.int_from(tag)?;
        let index = usize::try_from(index)
            .map_err(|_| ProtocolError::ValueOutOfRange { kind: "type index", value: index as i64 })?;
        self.types
            .get(index)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownType { index, defined: self.types.len() }.into())
    }

    /// Consume a list header. `Ok(None)` if the next value is not a list.
    pub fn read_list_start(&mut self) -> Result<Option<ListHeader>> {
        let Some(tag) = self.peek()? else {
            return Ok(None);
        };
        let header = match tag {
            tags::LIST_VARIABLE => {
                self.read_tag()?;
                ListHeader { type_name: Some(self.read_type()?), length: None }
            }
            tags::LIST_FIXED => {
                self.read_tag()?;
                let type_name = Some(self.read_type()?);
                let length = Some(self.read_length("list")?);
                ListHeader { type_name, length }
            }
            tags::LIST_VARIABLE_UNTYPED => {
                self.read_tag()?;
                ListHeader { type_name: None, length: None }
            }
            tags::LIST_FIXED_UNTYPED => {
                self.read_tag()?;
                ListHeader { type_name: None, length: Some(self.read_length("list")?) }
            }
            0x70..=0x77 => {
                self.read_tag()?;
                let length = Some((tag - LIST_DIRECT) as usize);
                ListHeader { type_name: Some(self.read_type()?), length }
            }
            0x78..=0x7f => {
                self.read_tag()?;
                ListHeader { type_name: None, length: Some((tag - LIST_DIRECT_UNTYPED) as usize) }
            }
            _ => return Ok(None),
        };
        Ok(Some(header))
    }

    /// Read a list as an iterator over its elements. A null reads as an
    /// empty iterator; a back-reference iterates the referenced list.
    pub fn read_iter(&mut self) -> Result<std::vec::IntoIter<Value>> {
        if let Some(header) = self.read_list_start()? {
            return IteratorDeserializer.read_list(self, header.length);
        }
        match self.read_object()? {
            Value::Null => Ok(Vec::new().into_iter()),
            Value::List(list) => Ok(list.items().clone().into_iter()),
            other => Err(ProtocolError::UnexpectedTag {
                expected: "list",
                tag: first_tag_of(&other),
            }
            .into()),
        }
    }

    fn read_length(&mut self, kind: &'static str) -> Result<usize> {
        let len = self.read_int()?;
        usize::try_from(len).map_err(|_| ProtocolError::InvalidLength { kind, len: len as i64 }.into())
    }

    /// Int from any int or long form, range-checked.
    fn int_from(&mut self, tag: u8) -> Result<i32> {
        if codec::is_int_tag(tag) {
            return codec::decode_int(tag, &mut self.input);
        }
        if codec::is_long_tag(tag) {
            let v = codec::decode_long(tag, &mut self.input)?;
            return i32::try_from(v).map_err(|_| ProtocolError::ValueOutOfRange { kind: "int", value: v }.into());
        }
        Err(ProtocolError::UnexpectedTag { expected: "int", tag }.into())
    }

    fn read_class_definition(&mut self) -> Result<()> {
        let type_name = self
            .read_string()?
            .ok_or(ProtocolError::UnexpectedTag { expected: "class name", tag: tags::NULL })?;
        let count = self.read_length("class field")?;
        let mut field_names = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let name = self
                .read_string()?
                .ok_or(ProtocolError::UnexpectedTag { expected: "field name", tag: tags::NULL })?;
            field_names.push(name);
        }
        debug!(class = %type_name, index = self.classes.len(), fields = count, "class definition read");
        self.classes.push(Rc::new(ClassDefinition { type_name, field_names }));
        self.counters.definitions_read += 1;
        Ok(())
    }

    fn read_instance(&mut self, index: usize) -> Result<Value> {
        let def = self
            .classes
            .get(index)
            .cloned()
            .ok_or(ProtocolError::UnknownClassDefinition { index, defined: self.classes.len() })?;
        let obj = Rc::new(GenericObject::new(def.type_name.clone()));
        self.add_ref(Value::Object(obj.clone() as ObjectRef));
        for name in &def.field_names {
            let value = self.read_object()?;
            obj.push_field(name.clone(), value);
        }
        self.counters.objects_read += 1;
        Ok(Value::Object(obj))
    }

    fn read_list_items(&mut self, header: ListHeader) -> Result<Value> {
        let list = Rc::new(ListValue::new(header.type_name, Vec::new()));
        self.add_ref(Value::List(list.clone()));
        match header.length {
            Some(n) => {
                for _ in 0..n {
                    let item = self.read_object()?;
                    list.push(item);
                }
            }
            None => {
                while !self.is_end()? {
                    let item = self.read_object()?;
                    list.push(item);
                }
                self.read_end()?;
            }
        }
        Ok(Value::List(list))
    }

    fn read_map_entries(&mut self, map: MapValue) -> Result<Value> {
        let map = Rc::new(map);
        self.add_ref(Value::Map(map.clone()));
        while !self.is_end()? {
            let key = self.read_object()?;
            let value = self.read_object()?;
            map.insert(key, value);
        }
        self.read_map_end()?;
        Ok(Value::Map(map))
    }

    /// `M type ... Z`. String keys mean a legacy-mode instance, read as a
    /// `GenericObject`; any other first key keeps the map a typed `MapValue`.
    /// String tags never register references, so peeking is safe.
    fn read_typed_map(&mut self, type_name: String) -> Result<Value> {
        match self.peek()? {
            Some(tag) if tag != tags::END && !codec::is_string_tag(tag) => {
                self.read_map_entries(MapValue::typed(type_name, Vec::new()))
            }
            _ => self.read_legacy_object(type_name),
        }
    }

    fn read_legacy_object(&mut self, type_name: String) -> Result<Value> {
        let obj = Rc::new(GenericObject::new(type_name));
        self.add_ref(Value::Object(obj.clone() as ObjectRef));
        while !self.is_end()? {
            let name = match self.read_object()? {
                Value::String(s) => s,
                _ => return Err(ProtocolError::InvalidFieldName { class: obj.type_name().to_string() }.into()),
            };
            let value = self.read_object()?;
            obj.push_field(name, value);
        }
        self.read_map_end()?;
        self.counters.objects_read += 1;
        Ok(Value::Object(obj))
    }

    fn read_value(&mut self) -> Result<Value> {
        loop {
            let tag = self.read_tag()?;
            let value = match tag {
                tags::NULL => Value::Null,
                tags::TRUE => Value::Bool(true),
                tags::FALSE => Value::Bool(false),
                tags::DATE | tags::DATE_MINUTE => Value::Date(codec::decode_date(tag, &mut self.input)?),
                t if codec::is_int_tag(t) => Value::Int(codec::decode_int(t, &mut self.input)?),
                t if codec::is_long_tag(t) => Value::Long(codec::decode_long(t, &mut self.input)?),
                t if codec::is_double_tag(t) => Value::Double(codec::decode_double(t, &mut self.input)?),
                t if codec::is_string_tag(t) => Value::String(codec::decode_string(t, &mut self.input)?),
                t if codec::is_binary_tag(t) => Value::Binary(codec::decode_binary(t, &mut self.input)?.into()),
                tags::CLASS_DEF => {
                    self.read_class_definition()?;
                    continue;
                }
                tags::OBJECT => {
                    let index = self.read_length("class index")?;
                    self.read_instance(index)?
                }
                0x60..=0x6f => self.read_instance((tag - OBJECT_DIRECT) as usize)?,
                tags::REF => {
                    let index = self.read_length("reference")?;
                    trace!(index, "back-reference");
                    self.counters.refs_read += 1;
                    self.refs
                        .get(index)
                        .cloned()
                        .ok_or(ProtocolError::InvalidReference { index, defined: self.refs.len() })?
                }
                tags::MAP_UNTYPED => self.read_map_entries(MapValue::new(Vec::new()))?,
                tags::MAP_TYPED => {
                    let type_name = self.read_type()?;
                    if type_name.is_empty() {
                        self.read_map_entries(MapValue::new(Vec::new()))?
                    } else {
                        self.read_typed_map(type_name)?
                    }
                }
                tags::LIST_VARIABLE => {
                    let header = ListHeader { type_name: Some(self.read_type()?), length: None };
                    self.read_list_items(header)?
                }
                tags::LIST_FIXED => {
                    let type_name = Some(self.read_type()?);
                    let length = Some(self.read_length("list")?);
                    self.read_list_items(ListHeader { type_name, length })?
                }
                tags::LIST_VARIABLE_UNTYPED => {
                    self.read_list_items(ListHeader { type_name: None, length: None })?
                }
                tags::LIST_FIXED_UNTYPED => {
                    let length = Some(self.read_length("list")?);
                    self.read_list_items(ListHeader { type_name: None, length })?
                }
                0x70..=0x77 => {
                    let type_name = Some(self.read_type()?);
                    let length = Some((tag - LIST_DIRECT) as usize);
                    self.read_list_items(ListHeader { type_name, length })?
                }
                0x78..=0x7f => {
                    let length = Some((tag - LIST_DIRECT_UNTYPED) as usize);
                    self.read_list_items(ListHeader { type_name: None, length })?
                }
                _ => return Err(ProtocolError::UnexpectedTag { expected: "value", tag }.into()),
            };
            return Ok(value);
        }
    }
}

impl<R: StreamSource> Hessian2Input<R> {
    /// Close the source if configured to. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.config.close_stream_on_close {
            self.input.get_mut().close()?;
        }
        self.timer.finish();
        Ok(())
    }
}

/// Representative tag for diagnostics when a whole value was the wrong kind.
fn first_tag_of(value: &Value) -> u8 {
    match value {
        Value::Null => tags::NULL,
        Value::Bool(true) => tags::TRUE,
        Value::Bool(false) => tags::FALSE,
        Value::Int(_) => tags::INT,
        Value::Long(_) => tags::LONG,
        Value::Double(_) => tags::DOUBLE,
        Value::String(_) => tags::STRING_FINAL,
        Value::Date(_) => tags::DATE,
        Value::Binary(_) => tags::BINARY_FINAL,
        Value::List(_) => tags::LIST_VARIABLE_UNTYPED,
        Value::Map(_) => tags::MAP_UNTYPED,
        Value::Object(_) => tags::OBJECT,
    }
}

impl<R: Read> ObjectInput for Hessian2Input<R> {
    fn is_end(&mut self) -> Result<bool> {
        Ok(matches!(self.peek()?, None | Some(tags::END)))
    }

    fn read_end(&mut self) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != tags::END {
            return Err(ProtocolError::UnexpectedTag { expected: "end of list", tag }.into());
        }
        Ok(())
    }

    fn read_map_end(&mut self) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != tags::END {
            return Err(ProtocolError::UnexpectedTag { expected: "end of map", tag }.into());
        }
        Ok(())
    }

    fn read_object(&mut self) -> Result<Value> {
        if self.depth >= self.config.max_depth {
            return Err(ProtocolError::DepthExceeded { limit: self.config.max_depth }.into());
        }
        let started = (self.depth == 0).then(Instant::now);
        self.depth += 1;
        let result = self.read_value();
        self.depth -= 1;
        if let Some(started) = started {
            self.timer.add_stage_time(Stage::Read, started.elapsed());
        }
        result
    }

    fn read_string(&mut self) -> Result<Option<String>> {
        let tag = self.read_tag()?;
        if tag == tags::NULL {
            return Ok(None);
        }
        codec::decode_string(tag, &mut self.input).map(Some)
    }

    fn read_int(&mut self) -> Result<i32> {
        let tag = self.read_tag()?;
        self.int_from(tag)
    }

    fn read_long(&mut self) -> Result<i64> {
        let tag = self.read_tag()?;
        if codec::is_long_tag(tag) {
            return codec::decode_long(tag, &mut self.input);
        }
        if codec::is_int_tag(tag) {
            return Ok(codec::decode_int(tag, &mut self.input)? as i64);
        }
        Err(ProtocolError::UnexpectedTag { expected: "long", tag }.into())
    }

    fn read_double(&mut self) -> Result<f64> {
        let tag = self.read_tag()?;
        if codec::is_double_tag(tag) {
            return codec::decode_double(tag, &mut self.input);
        }
        if codec::is_int_tag(tag) {
            return Ok(codec::decode_int(tag, &mut self.input)? as f64);
        }
        if codec::is_long_tag(tag) {
            return Ok(codec::decode_long(tag, &mut self.input)? as f64);
        }
        Err(ProtocolError::UnexpectedTag { expected: "double", tag }.into())
    }

    fn read_boolean(&mut self) -> Result<bool> {
        match self.read_tag()? {
            tags::TRUE => Ok(true),
            tags::FALSE | tags::NULL => Ok(false),
            t if codec::is_int_tag(t) => Ok(codec::decode_int(t, &mut self.input)? != 0),
            tag => Err(ProtocolError::UnexpectedTag { expected: "boolean", tag }.into()),
        }
    }

    fn read_utc_date(&mut self) -> Result<Option<i64>> {
        let tag = self.read_tag()?;
        if tag == tags::NULL {
            return Ok(None);
        }
        codec::decode_date(tag, &mut self.input).map(Some)
    }

    fn add_ref(&mut self, value: Value) -> usize {
        self.refs.push(value);
        self.refs.len() - 1
    }
}
