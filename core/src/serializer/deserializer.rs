//! serializer/deserializer.rs
//! Iterator deserializer: a list body read into an owning iterator.

use std::rc::Rc;
use std::vec::IntoIter;

use crate::io::ObjectInput;
use crate::types::Result;
use crate::value::{ListValue, Value};

/// Reads the elements of a list whose header has already been consumed.
///
/// The list is registered for back-references before its elements are read,
/// the same as any other list, so reference indexes stay aligned with the
/// writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct IteratorDeserializer;

impl IteratorDeserializer {
    /// `length` is `Some(n)` for fixed lists and `None` for lists closed by `Z`.
    pub fn read_list(&self, input: &mut dyn ObjectInput, length: Option<usize>) -> Result<IntoIter<Value>> {
        let list = Rc::new(ListValue::new(None, Vec::new()));
        input.add_ref(Value::List(list.clone()));

        match length {
            Some(n) => {
                for _ in 0..n {
                    list.push(input.read_object()?);
                }
            }
            None => {
                while !input.is_end()? {
                    list.push(input.read_object()?);
                }
                input.read_end()?;
            }
        }

        let items = list.items().clone();
        Ok(items.into_iter())
    }
}
