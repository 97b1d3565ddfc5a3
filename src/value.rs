//! Dynamically typed record values driven by a [Schema].

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::custom::CustomCodec;
use crate::errors::{Error, Result};
use crate::schema::Schema;

/// A field value inside a [Record].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The nil-pointer analogue: packs as the zero of the field's serialized
    /// shape; unpack allocates a fresh instance in its place.
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Struct(Record),
    Bitmap(Bitmap),
    Custom(Box<dyn CustomCodec>),
}

impl Value {
    /// Length of a sequence-like value, as a `sizeof` carrier records it:
    /// bytes for strings and buffers, elements for sequences.
    pub fn seq_len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.len()),
            Value::Bytes(b) => Some(b.len()),
            Value::Seq(v) => Some(v.len()),
            Value::Null => Some(0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            Value::Bitmap(b) => Some(b),
            _ => None,
        }
    }

    /// Integer reading used for `sizefrom` references. Out-of-range unsigned
    /// values saturate; the caller's length guard rejects them.
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => Some((*u).min(i64::MAX as u64) as i64),
            _ => None,
        }
    }

    /// Raw two's-complement bit pattern for integer encoding. Null packs as
    /// zero.
    pub(crate) fn int_bits(&self) -> Option<u64> {
        match self {
            Value::Null => Some(0),
            Value::Bool(b) => Some(*b as u64),
            Value::Int(i) => Some(*i as u64),
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub(crate) fn truthy(&self) -> Option<bool> {
        match self {
            Value::Null => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Uint(u) => Some(*u != 0),
            _ => None,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::F32(f) => Some(*f as f64),
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }
}

/// A structured value: one [Value] per schema field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a record with every field at its zero value.
    pub fn new(schema: &Arc<Schema>) -> Self {
        let values = schema.fields().iter().map(|f| f.host.zero()).collect();
        Record {
            schema: schema.clone(),
            values,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.schema.index_of(name) {
            Some(i) => {
                self.values[i] = value;
                Ok(())
            }
            None => Err(Error::InvalidArgument(format!(
                "`{}` is not a field of `{}`",
                name,
                self.schema.name()
            ))),
        }
    }

    /// Builder form of [Record::set].
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a field of the schema.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        if let Err(err) = self.set(name, value) {
            panic!("{err}");
        }
        self
    }

    pub(crate) fn value_at(&self, index: usize) -> &Value {
        &self.values[index]
    }

    pub(crate) fn set_at(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }

    /// Takes a value out for in-place rebuilding, leaving Null behind.
    pub(crate) fn take_at(&mut self, index: usize) -> Value {
        std::mem::replace(&mut self.values[index], Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Host;

    fn pair() -> Arc<Schema> {
        Schema::builder("Pair")
            .field("len", Host::U8)
            .field("data", Host::Bytes)
            .build()
    }

    #[test]
    fn test_new_record_is_zeroed() {
        let record = Record::new(&pair());
        assert_eq!(record.get("len"), Some(&Value::Uint(0)));
        assert_eq!(record.get("data"), Some(&Value::Bytes(Vec::new())));
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut record = Record::new(&pair());
        assert!(record.set("nope", Value::Uint(1)).is_err());
    }

    #[test]
    fn test_seq_len() {
        assert_eq!(Value::Str("abc".into()).seq_len(), Some(3));
        assert_eq!(Value::Bytes(vec![1, 2]).seq_len(), Some(2));
        assert_eq!(Value::Seq(vec![Value::Int(1)]).seq_len(), Some(1));
        assert_eq!(Value::Null.seq_len(), Some(0));
        assert_eq!(Value::Int(9).seq_len(), None);
    }

    #[test]
    fn test_int_bits_truncates_nothing() {
        assert_eq!(Value::Int(-1).int_bits(), Some(u64::MAX));
        assert_eq!(Value::Uint(7).int_bits(), Some(7));
        assert_eq!(Value::Null.int_bits(), Some(0));
    }
}
