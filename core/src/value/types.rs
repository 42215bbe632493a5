//! value/types.rs
//! Dynamic object graph exchanged with the codec.
//!
//! Design notes:
//! - Lists, maps and objects are `Rc` handles: their allocation is their
//!   identity, which is what the per-stream reference tables key on.
//! - Containers use `RefCell` so the reader can register a container before
//!   its children exist, which is how cycles are rebuilt.
//! - Equality is by value for scalars and by identity for containers.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::serializer::Serializer;
use crate::types::Result;
use crate::utils::hex_preview;
use crate::value::date::{datetime_from_millis, UtcMillis};

/// A value that knows how it is written to a Hessian stream.
///
/// Implemented automatically for every `Serializable` type and for
/// `GenericObject`.
pub trait HessianObject: Any {
    /// Serializer resolved for this object's concrete type.
    fn serializer(&self) -> Result<Arc<dyn Serializer>>;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a compound object.
pub type ObjectRef = Rc<dyn HessianObject>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    /// UTC milliseconds since the epoch.
    Date(i64),
    Binary(Bytes),
    List(Rc<ListValue>),
    Map(Rc<MapValue>),
    Object(ObjectRef),
}

impl Value {
    pub fn object<T: HessianObject>(obj: T) -> Self {
        Value::Object(Rc::new(obj))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        Value::Binary(b.into())
    }

    pub fn date<D: UtcMillis>(d: &D) -> Self {
        Value::Date(d.utc_millis())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(ListValue::new(None, items)))
    }

    pub fn typed_list(type_name: impl Into<String>, items: Vec<Value>) -> Self {
        Value::List(Rc::new(ListValue::new(Some(type_name.into()), items)))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(MapValue::new(entries)))
    }

    pub fn typed_map(type_name: impl Into<String>, entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(MapValue::typed(type_name, entries)))
    }

    /// Allocation identity for values that take part in reference tracking.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::List(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// True when both values are the same container allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Ints widen to long.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date_millis(&self) -> Option<i64> {
        match self {
            Value::Date(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.as_date_millis().and_then(datetime_from_millis)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Rc<ListValue>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Rc<MapValue>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The concrete object behind an `Object` handle.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(|o| o.as_any().downcast_ref::<T>())
    }

    /// Shorthand for `downcast_ref::<GenericObject>()`.
    pub fn as_generic(&self) -> Option<&GenericObject> {
        self.downcast_ref::<GenericObject>()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }
}

impl fmt::Debug for Value {
    // Containers print a summary only: a graph may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Date(ms) => write!(f, "Date({})", ms),
            Value::Binary(b) => write!(f, "Binary({})", hex_preview(b)),
            Value::List(l) => write!(
                f,
                "List({}, len={})",
                l.type_name().unwrap_or("-"),
                l.len()
            ),
            Value::Map(m) => write!(f, "Map(len={})", m.len()),
            Value::Object(o) => match o.as_any().downcast_ref::<GenericObject>() {
                Some(g) => write!(f, "Object({}, fields={:?})", g.type_name(), g.field_names()),
                None => write!(f, "Object(@{:p})", Rc::as_ptr(o) as *const ()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Ordered list, optionally typed.
pub struct ListValue {
    type_name: Option<String>,
    items: RefCell<Vec<Value>>,
}

impl ListValue {
    pub fn new(type_name: Option<String>, items: Vec<Value>) -> Self {
        Self { type_name, items: RefCell::new(items) }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

/// Map with entries kept in insertion order. A type name is carried when
/// the map was read from, or is written as, `M type ... Z`.
pub struct MapValue {
    type_name: Option<String>,
    entries: RefCell<Vec<(Value, Value)>>,
}

impl MapValue {
    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        Self { type_name: None, entries: RefCell::new(entries) }
    }

    pub fn typed(type_name: impl Into<String>, entries: Vec<(Value, Value)>) -> Self {
        Self { type_name: Some(type_name.into()), entries: RefCell::new(entries) }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn entries(&self) -> Ref<'_, Vec<(Value, Value)>> {
        self.entries.borrow()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn get_str(&self, key: &str) -> Option<Value> {
        self.entries
            .borrow()
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v.clone())
    }

    /// Insert or replace; returns the previous value.
    pub fn insert(&self, key: Value, value: Value) -> Option<Value> {
        let mut entries = self.entries.borrow_mut();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        entries.push((key, value));
        None
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// A compound instance known only by its type name and named fields.
///
/// This is what the reader produces for class instances and typed maps; it
/// can be written back out unchanged.
pub struct GenericObject {
    type_name: String,
    fields: RefCell<Vec<(String, Value)>>,
}

impl GenericObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: RefCell::new(Vec::new()) }
    }

    pub fn with_fields(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self { type_name: type_name.into(), fields: RefCell::new(fields) }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> Ref<'_, Vec<(String, Value)>> {
        self.fields.borrow()
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Set an existing field or append a new one.
    pub fn set_field(&self, name: &str, value: Value) {
        let mut fields = self.fields.borrow_mut();
        match fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name.to_string(), value)),
        }
    }

    /// Append without checking for duplicates (reader path).
    pub(crate) fn push_field(&self, name: String, value: Value) {
        self.fields.borrow_mut().push((name, value));
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.borrow().is_empty()
    }
}
