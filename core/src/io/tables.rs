//! io/tables.rs
//! Per-stream tables owned by the writer: references, class schemas, types.
//!
//! Invariants:
//! - Reference indexes are assigned in first-occurrence order and match the
//!   order the reader registers values.
//! - Every registered value is retained until the table is cleared, so an
//!   allocation address can never be reused for a different value.
//! - Class index N always names the same field list for the stream's life.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Default)]
pub struct ReferenceTable {
    by_identity: HashMap<usize, usize>,
    retained: Vec<Value>,
    next: usize,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, value: &Value) -> Option<usize> {
        value.identity().and_then(|id| self.by_identity.get(&id).copied())
    }

    /// Register `value`. Returns the existing index if it was already known,
    /// `None` if a fresh index was assigned.
    pub fn add(&mut self, value: &Value) -> Option<usize> {
        let id = value.identity()?;
        if let Some(index) = self.by_identity.get(&id) {
            return Some(*index);
        }
        self.by_identity.insert(id, self.next);
        self.retained.push(value.clone());
        self.next += 1;
        None
    }

    /// Consume an index without recording identity (unshared writes).
    pub fn skip(&mut self) -> usize {
        let index = self.next;
        self.next += 1;
        index
    }

    /// Move `old`'s index to `new`. Returns false if `old` is unknown.
    pub fn replace(&mut self, old: &Value, new: &Value) -> bool {
        let (Some(old_id), Some(new_id)) = (old.identity(), new.identity()) else {
            return false;
        };
        match self.by_identity.remove(&old_id) {
            Some(index) => {
                self.by_identity.insert(new_id, index);
                self.retained.push(new.clone());
                true
            }
            None => false,
        }
    }

    /// Number of indexes handed out so far.
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn clear(&mut self) {
        self.by_identity.clear();
        self.retained.clear();
        self.next = 0;
    }
}

/// `{type name, field names}` for one class index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSchema {
    pub type_name: String,
    pub field_names: Vec<String>,
}

#[derive(Default)]
pub struct ClassTable {
    schemas: Vec<ClassSchema>,
    by_name: HashMap<String, usize>,
}

impl ClassTable {
    pub fn lookup(&self, type_name: &str) -> Option<usize> {
        self.by_name.get(type_name).copied()
    }

    /// Reserve the next index for `type_name`; its field list is filled in
    /// once the definition has been written.
    pub fn define(&mut self, type_name: &str) -> usize {
        let index = self.schemas.len();
        self.schemas.push(ClassSchema {
            type_name: type_name.to_string(),
            field_names: Vec::new(),
        });
        self.by_name.insert(type_name.to_string(), index);
        index
    }

    pub fn set_fields(&mut self, index: usize, field_names: Vec<String>) {
        if let Some(schema) = self.schemas.get_mut(index) {
            schema.field_names = field_names;
        }
    }

    pub fn get(&self, index: usize) -> Option<&ClassSchema> {
        self.schemas.get(index)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Type strings already sent on this stream.
#[derive(Default)]
pub struct TypeTable {
    by_name: HashMap<String, usize>,
}

impl TypeTable {
    /// Existing index for `type_name`, or `None` after assigning a new one.
    pub fn lookup_or_insert(&mut self, type_name: &str) -> Option<usize> {
        if let Some(index) = self.by_name.get(type_name) {
            return Some(*index);
        }
        let index = self.by_name.len();
        self.by_name.insert(type_name.to_string(), index);
        None
    }
}
