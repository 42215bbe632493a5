//! serializer/field_writer.rs
//!
//! Typed field writers: one strategy per declared field kind.
//!
//! Design notes:
//! - Accessors are closures bound when the class descriptor is built; they
//!   cannot fail, so a field write only fails on the output.
//! - Every failure is wrapped with the declaring class and field name.

use std::fmt;
use std::sync::Arc;

use crate::io::ObjectOutput;
use crate::types::Result;
use crate::value::Value;

bitflags::bitflags! {
    /// Declared field modifiers; either one excludes the field from the plan.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FieldModifiers: u8 {
        /// Not part of the serialized state.
        const TRANSIENT = 0b0000_0001;

        /// Belongs to the type, not the instance.
        const STATIC = 0b0000_0010;
    }
}

/// Declared kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Object,
}

impl FieldKind {
    /// Primitive-like fields are written before compound ones.
    pub fn is_primitive_like(self) -> bool {
        !matches!(self, FieldKind::Date | FieldKind::Object)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool   => "bool",
            FieldKind::Byte   => "byte",
            FieldKind::Char   => "char",
            FieldKind::Short  => "short",
            FieldKind::Int    => "int",
            FieldKind::Long   => "long",
            FieldKind::Float  => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Date   => "date",
            FieldKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Immutable description of one serialized field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub declaring_class: String,
    pub name: String,
    pub kind: FieldKind,
}

pub(crate) type StrAccessor<T> = Arc<dyn for<'a> Fn(&'a T) -> Option<&'a str> + Send + Sync>;

/// Bound accessor, one variant per kind.
pub(crate) enum Accessor<T> {
    Bool(Arc<dyn Fn(&T) -> bool + Send + Sync>),
    Byte(Arc<dyn Fn(&T) -> i8 + Send + Sync>),
    Char(Arc<dyn Fn(&T) -> char + Send + Sync>),
    Short(Arc<dyn Fn(&T) -> i16 + Send + Sync>),
    Int(Arc<dyn Fn(&T) -> i32 + Send + Sync>),
    Long(Arc<dyn Fn(&T) -> i64 + Send + Sync>),
    Float(Arc<dyn Fn(&T) -> f32 + Send + Sync>),
    Double(Arc<dyn Fn(&T) -> f64 + Send + Sync>),
    Str(StrAccessor<T>),
    /// UTC millis, `None` for an absent date.
    Date(Arc<dyn Fn(&T) -> Option<i64> + Send + Sync>),
    Object(Arc<dyn Fn(&T) -> Value + Send + Sync>),
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Bool(f) => Accessor::Bool(f.clone()),
            Accessor::Byte(f) => Accessor::Byte(f.clone()),
            Accessor::Char(f) => Accessor::Char(f.clone()),
            Accessor::Short(f) => Accessor::Short(f.clone()),
            Accessor::Int(f) => Accessor::Int(f.clone()),
            Accessor::Long(f) => Accessor::Long(f.clone()),
            Accessor::Float(f) => Accessor::Float(f.clone()),
            Accessor::Double(f) => Accessor::Double(f.clone()),
            Accessor::Str(f) => Accessor::Str(f.clone()),
            Accessor::Date(f) => Accessor::Date(f.clone()),
            Accessor::Object(f) => Accessor::Object(f.clone()),
        }
    }
}

/// Pins the higher-ranked signature so closures borrowing from `T` infer.
pub(crate) fn str_accessor<T, F>(f: F) -> StrAccessor<T>
where
    F: for<'a> Fn(&'a T) -> Option<&'a str> + Send + Sync + 'static,
{
    Arc::new(f)
}

impl<T: 'static> Accessor<T> {
    pub(crate) fn kind(&self) -> FieldKind {
        match self {
            Accessor::Bool(_) => FieldKind::Bool,
            Accessor::Byte(_) => FieldKind::Byte,
            Accessor::Char(_) => FieldKind::Char,
            Accessor::Short(_) => FieldKind::Short,
            Accessor::Int(_) => FieldKind::Int,
            Accessor::Long(_) => FieldKind::Long,
            Accessor::Float(_) => FieldKind::Float,
            Accessor::Double(_) => FieldKind::Double,
            Accessor::Str(_) => FieldKind::String,
            Accessor::Date(_) => FieldKind::Date,
            Accessor::Object(_) => FieldKind::Object,
        }
    }

    /// Rebind to a type that embeds `T`.
    pub(crate) fn project<U: 'static>(self, project: fn(&U) -> &T) -> Accessor<U> {
        match self {
            Accessor::Bool(f) => Accessor::Bool(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Byte(f) => Accessor::Byte(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Char(f) => Accessor::Char(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Short(f) => Accessor::Short(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Int(f) => Accessor::Int(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Long(f) => Accessor::Long(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Float(f) => Accessor::Float(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Double(f) => Accessor::Double(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Str(f) => Accessor::Str(str_accessor(move |u: &U| f(project(u)))),
            Accessor::Date(f) => Accessor::Date(Arc::new(move |u: &U| f(project(u)))),
            Accessor::Object(f) => Accessor::Object(Arc::new(move |u: &U| f(project(u)))),
        }
    }
}

/// Writes one field of a `T` through the matching wire primitive.
pub struct FieldWriter<T> {
    declaring_class: String,
    name: String,
    accessor: Accessor<T>,
}

impl<T: 'static> FieldWriter<T> {
    pub(crate) fn new(declaring_class: String, name: String, accessor: Accessor<T>) -> Self {
        Self { declaring_class, name, accessor }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn kind(&self) -> FieldKind {
        self.accessor.kind()
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            declaring_class: self.declaring_class.clone(),
            name: self.name.clone(),
            kind: self.kind(),
        }
    }

    pub fn write(&self, obj: &T, out: &mut dyn ObjectOutput) -> Result<()> {
        self.write_value(obj, out)
            .map_err(|e| e.in_field(&self.declaring_class, &self.name))
    }

    fn write_value(&self, obj: &T, out: &mut dyn ObjectOutput) -> Result<()> {
        match &self.accessor {
            Accessor::Bool(f) => out.write_boolean(f(obj)),
            Accessor::Byte(f) => out.write_int(f(obj) as i32),
            Accessor::Char(f) => {
                let mut buf = [0u8; 4];
                out.write_string(f(obj).encode_utf8(&mut buf))
            }
            Accessor::Short(f) => out.write_int(f(obj) as i32),
            Accessor::Int(f) => out.write_int(f(obj)),
            Accessor::Long(f) => out.write_long(f(obj)),
            Accessor::Float(f) => out.write_double(f(obj) as f64),
            Accessor::Double(f) => out.write_double(f(obj)),
            Accessor::Str(f) => match f(obj) {
                Some(s) => out.write_string(s),
                None => out.write_null(),
            },
            Accessor::Date(f) => match f(obj) {
                Some(millis) => out.write_utc_date(millis),
                None => out.write_null(),
            },
            Accessor::Object(f) => out.write_object(&f(obj)),
        }
    }
}
