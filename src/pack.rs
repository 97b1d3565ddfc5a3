//! Packing: drives a compiled [Plan] over a [Record], writing wire bytes in
//! strict field declaration order.

use std::io::Write;
use std::sync::Arc;

use crate::custom;
use crate::errors::{Error, Result};
use crate::options::Options;
use crate::plan::{Len, Plan, PlanEntry};
use crate::schema::{Host, Schema};
use crate::value::{Record, Value};
use crate::wire::{ByteOrder, WireType};

pub(crate) fn pack_record<W: Write>(
    w: &mut W,
    plan: &Plan,
    record: &Record,
    opts: &Options,
) -> Result<usize> {
    if !Arc::ptr_eq(plan.schema(), record.schema()) {
        return Err(Error::InvalidArgument(format!(
            "record of type `{}` does not match plan `{}`",
            record.schema().name(),
            plan.schema().name()
        )));
    }
    let mut written = 0;
    for (i, entry) in plan.entries().iter().enumerate() {
        if entry.skip {
            continue;
        }
        let order = opts.byte_order.or(entry.order).unwrap_or(ByteOrder::Big);
        if let Some(target) = entry.sizeof {
            // A size carrier's wire value comes from the data it describes,
            // never from the integer stored in the record.
            let target_entry = &plan.entries()[target];
            let data_len = record
                .value_at(target)
                .seq_len()
                .ok_or_else(|| mismatch(target_entry, "a sized value"))?;
            let n = data_len + target_entry.null_terminated as usize;
            order
                .write_uint(w, n as u64, entry.wire.size())
                .map_err(Error::from_io)?;
            written += entry.wire.size();
            continue;
        }
        let len = resolve_len(entry, record)?;
        written += pack_value(w, entry, record.value_at(i), len, order, opts)?;
    }
    Ok(written)
}

/// Length known before looking at the value itself, if any. A reverse-linked
/// `sizeof` target yields `None`: the data is authoritative when packing.
pub(crate) fn resolve_len(entry: &PlanEntry, record: &Record) -> Result<Option<usize>> {
    match entry.len {
        Len::Fixed(n) => Ok(Some(n)),
        Len::From {
            field,
            derived: false,
        } => {
            let n = record
                .value_at(field)
                .as_i64()
                .ok_or_else(|| mismatch(entry, "an integer length field"))?;
            if n < 0 {
                return Err(Error::InvalidLength(n));
            }
            Ok(Some(n as usize))
        }
        Len::From { derived: true, .. } | Len::None => Ok(None),
    }
}

fn pack_value<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    len: Option<usize>,
    order: ByteOrder,
    opts: &Options,
) -> Result<usize> {
    match entry.wire {
        WireType::Pad => {
            let n = len.unwrap_or(1);
            write_zeros(w, n)?;
            Ok(n)
        }
        WireType::Struct => pack_struct(w, entry, value, len, opts),
        WireType::Custom => pack_custom(w, entry, value, opts),
        WireType::String => pack_string(w, entry, value, len),
        _ => match &entry.host {
            Host::Bitmap(map) => {
                let n = match value {
                    Value::Bitmap(bitmap) => bitmap.value(map)?,
                    Value::Null => 0,
                    _ => return Err(mismatch(entry, "a bitmap")),
                };
                order
                    .write_uint(w, n, entry.wire.size())
                    .map_err(Error::from_io)?;
                Ok(entry.wire.size())
            }
            Host::Str | Host::Bytes => pack_byte_seq(w, entry, value, len),
            Host::Seq(inner) => pack_scalar_seq(w, entry, inner, value, len, order),
            _ => write_scalar(w, entry, value, order),
        },
    }
}

fn pack_struct<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    len: Option<usize>,
    opts: &Options,
) -> Result<usize> {
    let schema = nested_schema(&entry.host).ok_or_else(|| mismatch(entry, "a nested record"))?;
    let plan = Plan::of(schema)?;
    if entry.slice {
        let elems = seq_elements(entry, value)?;
        let count = len.unwrap_or(elems.len());
        let zero = Record::new(schema);
        let mut written = 0;
        for index in 0..count {
            let element = match elems.get(index) {
                Some(Value::Struct(record)) => record,
                Some(Value::Null) | None => &zero,
                Some(_) => return Err(mismatch(entry, "a sequence of records")),
            };
            written += pack_record(w, &plan, element, opts)?;
        }
        Ok(written)
    } else {
        match value {
            Value::Struct(record) => pack_record(w, &plan, record, opts),
            Value::Null => pack_record(w, &plan, &Record::new(schema), opts),
            _ => Err(mismatch(entry, "a nested record")),
        }
    }
}

fn pack_custom<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    opts: &Options,
) -> Result<usize> {
    let tag = match entry.host {
        Host::Custom(tag) => tag,
        _ => return Err(mismatch(entry, "a custom value")),
    };
    match value {
        Value::Custom(codec) => codec.pack(w, opts),
        Value::Null => custom::instantiate(tag)?.pack(w, opts),
        _ => Err(mismatch(entry, "a custom value")),
    }
}

fn pack_string<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    len: Option<usize>,
) -> Result<usize> {
    if entry.slice {
        // Elements of a string sequence are NUL-delimited on the wire.
        let elems = seq_elements(entry, value)?;
        let count = len.unwrap_or(elems.len());
        let mut written = 0;
        for index in 0..count {
            let s = match elems.get(index) {
                Some(Value::Str(s)) => s.as_str(),
                Some(Value::Null) | None => "",
                Some(_) => return Err(mismatch(entry, "a sequence of strings")),
            };
            w.write_all(s.as_bytes())?;
            w.write_all(&[0])?;
            written += s.len() + 1;
        }
        return Ok(written);
    }
    let s = match value {
        Value::Str(s) => s.as_str(),
        Value::Null => "",
        _ => return Err(mismatch(entry, "a string")),
    };
    let bytes = s.as_bytes();
    match len {
        Some(l) => {
            let n = bytes.len().min(l);
            w.write_all(&bytes[..n])?;
            write_zeros(w, l - n)?;
            Ok(l)
        }
        None => {
            w.write_all(bytes)?;
            if entry.null_terminated {
                w.write_all(&[0])?;
                Ok(bytes.len() + 1)
            } else {
                Ok(bytes.len())
            }
        }
    }
}

fn pack_byte_seq<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    len: Option<usize>,
) -> Result<usize> {
    let bytes: &[u8] = match value {
        Value::Bytes(bytes) => bytes,
        Value::Str(s) => s.as_bytes(),
        Value::Null => &[],
        _ => return Err(mismatch(entry, "bytes")),
    };
    let l = len.unwrap_or(bytes.len());
    let n = bytes.len().min(l);
    w.write_all(&bytes[..n])?;
    write_zeros(w, l - n)?;
    Ok(l)
}

fn pack_scalar_seq<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    inner: &Host,
    value: &Value,
    len: Option<usize>,
    order: ByteOrder,
) -> Result<usize> {
    let elems = seq_elements(entry, value)?;
    let count = len.unwrap_or(elems.len());
    let zero = inner.zero();
    let mut written = 0;
    for index in 0..count {
        let element = elems.get(index).unwrap_or(&zero);
        written += write_scalar(w, entry, element, order)?;
    }
    Ok(written)
}

fn write_scalar<W: Write>(
    w: &mut W,
    entry: &PlanEntry,
    value: &Value,
    order: ByteOrder,
) -> Result<usize> {
    match entry.wire {
        WireType::Bool => {
            let bit = value.truthy().ok_or_else(|| mismatch(entry, "a boolean"))?;
            w.write_all(&[bit as u8])?;
            Ok(1)
        }
        WireType::Float32 => {
            let f = value.as_f64().ok_or_else(|| mismatch(entry, "a float"))?;
            order.write_f32(w, f as f32).map_err(Error::from_io)?;
            Ok(4)
        }
        WireType::Float64 => {
            let f = value.as_f64().ok_or_else(|| mismatch(entry, "a float"))?;
            order.write_f64(w, f).map_err(Error::from_io)?;
            Ok(8)
        }
        _ => {
            let bits = value
                .int_bits()
                .ok_or_else(|| mismatch(entry, "an integer"))?;
            order
                .write_uint(w, bits, entry.wire.size())
                .map_err(Error::from_io)?;
            Ok(entry.wire.size())
        }
    }
}

pub(crate) fn nested_schema(host: &Host) -> Option<&Arc<Schema>> {
    match host {
        Host::Struct(schema) => Some(schema),
        Host::Seq(inner) => nested_schema(inner),
        _ => None,
    }
}

pub(crate) fn seq_elements<'a>(entry: &PlanEntry, value: &'a Value) -> Result<&'a [Value]> {
    match value {
        Value::Seq(elems) => Ok(elems),
        Value::Null => Ok(&[]),
        _ => Err(mismatch(entry, "a sequence")),
    }
}

pub(crate) fn mismatch(entry: &PlanEntry, expected: &str) -> Error {
    Error::TypeMismatch(format!("field `{}` expects {expected}", entry.name))
}

fn write_zeros<W: Write>(w: &mut W, mut n: usize) -> Result<()> {
    const ZEROS: [u8; 64] = [0u8; 64];
    while n > 0 {
        let chunk = n.min(ZEROS.len());
        w.write_all(&ZEROS[..chunk])?;
        n -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn pack_bytes(record: &Record) -> Vec<u8> {
        let mut buf = Vec::new();
        crate::pack(&mut buf, record).unwrap();
        buf
    }

    #[test]
    fn test_mixed_endian_scalars() {
        let schema = Schema::builder("Endian")
            .field_as("a", Host::I16, "big")
            .field_as("b", Host::U16, "little")
            .build();
        let record = Record::new(&schema)
            .with("a", Value::Int(2))
            .with("b", Value::Uint(6));
        assert_eq!(pack_bytes(&record), [0x00, 0x02, 0x06, 0x00]);
    }

    #[test]
    fn test_sizeof_ignores_stored_integer() {
        let schema = Schema::builder("Sized")
            .field_as("size", Host::U8, "sizeof=text")
            .field("text", Host::Str)
            .build();
        let record = Record::new(&schema)
            .with("size", Value::Uint(99))
            .with("text", Value::Str("1234".into()));
        assert_eq!(pack_bytes(&record), [0x04, 0x31, 0x32, 0x33, 0x34]);
        // The caller's record keeps the stale integer.
        assert_eq!(record.get("size"), Some(&Value::Uint(99)));
    }

    #[test]
    fn test_pad_runs_write_zeros() {
        let schema = Schema::builder("Padded")
            .field_as("pad", Host::Bytes, "[5]pad")
            .field("v", Host::I8)
            .build();
        let record = Record::new(&schema).with("v", Value::Int(1));
        assert_eq!(pack_bytes(&record), [0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_null_struct_packs_zero_shape() {
        let inner = Schema::builder("Inner")
            .field("a", Host::U16)
            .field("b", Host::U8)
            .build();
        let schema = Schema::builder("Outer")
            .field("n", Host::Struct(inner))
            .build();
        let record = Record::new(&schema);
        assert_eq!(pack_bytes(&record), [0, 0, 0]);
    }

    #[test]
    fn test_fixed_count_pads_short_sequence() {
        let schema = Schema::builder("Arr")
            .field_as("v", Host::Seq(Box::new(Host::U16)), "[4]uint16,little")
            .build();
        let record = Record::new(&schema).with(
            "v",
            Value::Seq(vec![Value::Uint(0x1122), Value::Uint(0x2233)]),
        );
        assert_eq!(
            pack_bytes(&record),
            [0x22, 0x11, 0x33, 0x22, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_call_order_dominates_field_order() {
        let schema = Schema::builder("Dominate")
            .field_as("v", Host::U16, "big")
            .build();
        let record = Record::new(&schema).with("v", Value::Uint(0x0102));
        let mut buf = Vec::new();
        crate::pack_with_order(&mut buf, &record, ByteOrder::Little).unwrap();
        assert_eq!(buf, [0x02, 0x01]);
    }
}
