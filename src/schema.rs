//! Schemas: declarative record type descriptors built once and shared.
//!
//! A [Schema] lists a record's fields in declaration order, each with its
//! host kind and an optional directive string. Building a schema never
//! fails; directive problems surface on first use of the type, when the
//! schema is compiled into a plan.

use std::sync::Arc;

use crate::bitmap::SymbolMap;
use crate::value::Value;
use crate::wire::WireType;

/// Semantic category of an in-memory field.
#[derive(Debug, Clone, PartialEq)]
pub enum Host {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// UTF-8 string.
    Str,
    /// Raw byte buffer.
    Bytes,
    /// Homogeneous sequence of another host kind.
    Seq(Box<Host>),
    /// Nested record of the given schema. A [Value::Null] in this slot packs
    /// as the zero of the nested shape and is re-allocated on unpack.
    Struct(Arc<Schema>),
    /// Symbolic bitmap backed by the given symbol map. The directive must
    /// name an integer wire type, which fixes the width on the wire.
    Bitmap(Arc<SymbolMap>),
    /// User codec registered under this type tag.
    Custom(&'static str),
}

impl Host {
    /// Wire type used when the directive does not name one. Bitmap fields
    /// have no default: their width comes from the directive.
    pub(crate) fn default_wire(&self) -> Option<WireType> {
        Some(match self {
            Host::Bool => WireType::Bool,
            Host::I8 => WireType::Int8,
            Host::I16 => WireType::Int16,
            Host::I32 => WireType::Int32,
            Host::I64 => WireType::Int64,
            Host::U8 => WireType::Uint8,
            Host::U16 => WireType::Uint16,
            Host::U32 => WireType::Uint32,
            Host::U64 => WireType::Uint64,
            Host::F32 => WireType::Float32,
            Host::F64 => WireType::Float64,
            Host::Str => WireType::String,
            Host::Bytes => WireType::Uint8,
            Host::Seq(inner) => return inner.default_wire(),
            Host::Struct(_) => WireType::Struct,
            Host::Bitmap(_) => return None,
            Host::Custom(_) => WireType::Custom,
        })
    }

    pub(crate) fn is_integer(&self) -> bool {
        matches!(
            self,
            Host::I8
                | Host::I16
                | Host::I32
                | Host::I64
                | Host::U8
                | Host::U16
                | Host::U32
                | Host::U64
        )
    }

    /// Whether values of this kind have a length a `sizeof` carrier can
    /// record.
    pub(crate) fn has_len(&self) -> bool {
        matches!(self, Host::Str | Host::Bytes | Host::Seq(_))
    }

    /// Width in bits and signedness for integer hosts.
    pub(crate) fn int_spec(&self) -> Option<(usize, bool)> {
        Some(match self {
            Host::I8 => (8, true),
            Host::I16 => (16, true),
            Host::I32 => (32, true),
            Host::I64 => (64, true),
            Host::U8 => (8, false),
            Host::U16 => (16, false),
            Host::U32 => (32, false),
            Host::U64 => (64, false),
            _ => return None,
        })
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Host::Bool => "bool",
            Host::I8 => "i8",
            Host::I16 => "i16",
            Host::I32 => "i32",
            Host::I64 => "i64",
            Host::U8 => "u8",
            Host::U16 => "u16",
            Host::U32 => "u32",
            Host::U64 => "u64",
            Host::F32 => "f32",
            Host::F64 => "f64",
            Host::Str => "string",
            Host::Bytes => "bytes",
            Host::Seq(_) => "sequence",
            Host::Struct(_) => "struct",
            Host::Bitmap(_) => "bitmap",
            Host::Custom(_) => "custom",
        }
    }

    /// The zero value a fresh [crate::Record] slot starts with.
    pub fn zero(&self) -> Value {
        match self {
            Host::Bool => Value::Bool(false),
            Host::I8 | Host::I16 | Host::I32 | Host::I64 => Value::Int(0),
            Host::U8 | Host::U16 | Host::U32 | Host::U64 => Value::Uint(0),
            Host::F32 => Value::F32(0.0),
            Host::F64 => Value::F64(0.0),
            Host::Str => Value::Str(String::new()),
            Host::Bytes => Value::Bytes(Vec::new()),
            Host::Seq(_) => Value::Seq(Vec::new()),
            Host::Struct(_) | Host::Custom(_) => Value::Null,
            Host::Bitmap(_) => Value::Bitmap(crate::bitmap::Bitmap::new()),
        }
    }
}

/// A single field: name, host kind and optional directive.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub host: Host,
    pub directive: Option<String>,
}

/// An ordered record type descriptor.
#[derive(Debug, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Adds a field with no directive: default wire type, inherited byte
    /// order.
    pub fn field(mut self, name: impl Into<String>, host: Host) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            host,
            directive: None,
        });
        self
    }

    /// Adds a field with a directive string.
    pub fn field_as(
        mut self,
        name: impl Into<String>,
        host: Host,
        directive: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            host,
            directive: Some(directive.into()),
        });
        self
    }

    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
        })
    }
}
