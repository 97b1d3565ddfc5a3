//! Unpacking: drives a compiled [Plan] over a byte source, decoding fields
//! into a mutable [Record] in the same order a pack produced them.

use std::io::{self, Read};
use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::custom;
use crate::errors::{Error, Result};
use crate::options::Options;
use crate::pack::{mismatch, nested_schema};
use crate::plan::{Len, Plan, PlanEntry};
use crate::schema::Host;
use crate::value::{Record, Value};
use crate::wire::{sign_extend, width_mask, ByteOrder, WireType};

pub(crate) fn unpack_record<R: Read>(
    r: &mut R,
    plan: &Plan,
    record: &mut Record,
    opts: &Options,
) -> Result<()> {
    if !Arc::ptr_eq(plan.schema(), record.schema()) {
        return Err(Error::InvalidArgument(format!(
            "record of type `{}` does not match plan `{}`",
            record.schema().name(),
            plan.schema().name()
        )));
    }
    for i in 0..plan.entries().len() {
        let entry = &plan.entries()[i];
        if entry.skip {
            continue;
        }
        let order = opts.byte_order.or(entry.order).unwrap_or(ByteOrder::Big);
        let len = resolve_len(entry, record, opts)?;
        match entry.wire {
            WireType::Pad => skip_bytes(r, len.unwrap_or(1))?,
            WireType::Struct => {
                let value = unpack_struct(r, entry, record.take_at(i), len, opts)?;
                record.set_at(i, value);
            }
            WireType::Custom => unpack_custom(r, entry, record, i, len, opts)?,
            WireType::String => unpack_string(r, entry, record, i, len)?,
            _ => match &entry.host {
                Host::Bitmap(map) => {
                    let raw = order
                        .read_uint(r, entry.wire.size())
                        .map_err(Error::from_io)?;
                    let mut bitmap = match record.take_at(i) {
                        Value::Bitmap(bitmap) => bitmap,
                        _ => Bitmap::new(),
                    };
                    bitmap.assign(raw, map);
                    record.set_at(i, Value::Bitmap(bitmap));
                }
                Host::Str | Host::Bytes => {
                    let value = read_byte_seq(r, entry, len.unwrap_or(0))?;
                    record.set_at(i, value);
                }
                Host::Seq(inner) => {
                    let count = len.unwrap_or(0);
                    let mut elems = Vec::with_capacity(count);
                    for _ in 0..count {
                        elems.push(read_scalar(r, entry, inner, order)?);
                    }
                    record.set_at(i, Value::Seq(elems));
                }
                host => {
                    let value = read_scalar(r, entry, host, order)?;
                    record.set_at(i, value);
                }
            },
        }
    }
    Ok(())
}

/// Length resolved from the plan and previously unpacked fields. Negative or
/// over-limit lengths from the wire are rejected.
fn resolve_len(entry: &PlanEntry, record: &Record, opts: &Options) -> Result<Option<usize>> {
    match entry.len {
        Len::Fixed(n) => Ok(Some(n)),
        Len::From { field, .. } => {
            let n = record
                .value_at(field)
                .as_i64()
                .ok_or_else(|| mismatch(entry, "an integer length field"))?;
            if n < 0 || n as u64 > opts.max_len as u64 {
                return Err(Error::InvalidLength(n));
            }
            Ok(Some(n as usize))
        }
        Len::None => Ok(None),
    }
}

fn unpack_struct<R: Read>(
    r: &mut R,
    entry: &PlanEntry,
    current: Value,
    len: Option<usize>,
    opts: &Options,
) -> Result<Value> {
    let schema = nested_schema(&entry.host).ok_or_else(|| mismatch(entry, "a nested record"))?;
    let plan = Plan::of(schema)?;
    if entry.slice {
        let count = len.unwrap_or(0);
        let mut elems = Vec::with_capacity(count);
        for _ in 0..count {
            let mut element = Record::new(schema);
            unpack_record(r, &plan, &mut element, opts)?;
            elems.push(Value::Struct(element));
        }
        Ok(Value::Seq(elems))
    } else {
        // Reuse the record in place; a Null slot gets a fresh allocation.
        let mut record = match current {
            Value::Struct(record) => record,
            _ => Record::new(schema),
        };
        unpack_record(r, &plan, &mut record, opts)?;
        Ok(Value::Struct(record))
    }
}

fn unpack_custom<R: Read>(
    r: &mut R,
    entry: &PlanEntry,
    record: &mut Record,
    index: usize,
    len: Option<usize>,
    opts: &Options,
) -> Result<()> {
    let tag = match entry.host {
        Host::Custom(tag) => tag,
        _ => return Err(mismatch(entry, "a custom value")),
    };
    let mut codec = match record.take_at(index) {
        Value::Custom(codec) => codec,
        _ => custom::instantiate(tag)?,
    };
    codec.unpack(r, len.unwrap_or(1), opts)?;
    record.set_at(index, Value::Custom(codec));
    Ok(())
}

fn unpack_string<R: Read>(
    r: &mut R,
    entry: &PlanEntry,
    record: &mut Record,
    index: usize,
    len: Option<usize>,
) -> Result<()> {
    if entry.slice {
        let count = len.unwrap_or(0);
        let mut elems = Vec::with_capacity(count);
        for _ in 0..count {
            elems.push(Value::Str(read_string(r, None, false)?));
        }
        record.set_at(index, Value::Seq(elems));
        return Ok(());
    }
    // A known zero length means the size is not usable: scan to the NUL
    // sentinel instead.
    let max = match len {
        Some(0) | None => None,
        Some(n) => Some(n),
    };
    let s = read_string(r, max, entry.null_terminated)?;
    record.set_at(index, Value::Str(s));
    Ok(())
}

/// Reads a string byte by byte until `max` bytes were consumed, a NUL
/// sentinel appears (always honored when `max` is unknown or the field is
/// null-terminated), or the source is exhausted. A consumed NUL is not part
/// of the result.
fn read_string<R: Read>(r: &mut R, max: Option<usize>, stop_at_nul: bool) -> Result<String> {
    let mut out = Vec::new();
    let mut consumed = 0usize;
    let mut byte = [0u8; 1];
    loop {
        if let Some(max) = max {
            if consumed >= max {
                break;
            }
        }
        match r.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                consumed += 1;
                if byte[0] == 0 && (stop_at_nul || max.is_none()) {
                    break;
                }
                out.push(byte[0]);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::Io(err)),
        }
    }
    String::from_utf8(out).map_err(|_| Error::Encoding("string field is not valid UTF-8".into()))
}

fn read_byte_seq<R: Read>(r: &mut R, entry: &PlanEntry, len: usize) -> Result<Value> {
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes).map_err(Error::from_io)?;
    match entry.host {
        Host::Str => String::from_utf8(bytes)
            .map(Value::Str)
            .map_err(|_| Error::Encoding("string field is not valid UTF-8".into())),
        _ => Ok(Value::Bytes(bytes)),
    }
}

fn read_scalar<R: Read>(
    r: &mut R,
    entry: &PlanEntry,
    host: &Host,
    order: ByteOrder,
) -> Result<Value> {
    match entry.wire {
        WireType::Float32 => {
            let f = order.read_f32(r).map_err(Error::from_io)?;
            float_value(entry, host, f as f64)
        }
        WireType::Float64 => {
            let f = order.read_f64(r).map_err(Error::from_io)?;
            float_value(entry, host, f)
        }
        _ => {
            let raw = order
                .read_uint(r, entry.wire.size())
                .map_err(Error::from_io)?;
            let bits = if entry.wire.is_signed() {
                sign_extend(raw, entry.wire.size() * 8) as u64
            } else {
                raw
            };
            int_value(entry, host, bits)
        }
    }
}

fn float_value(entry: &PlanEntry, host: &Host, f: f64) -> Result<Value> {
    match host {
        Host::F32 => Ok(Value::F32(f as f32)),
        Host::F64 => Ok(Value::F64(f)),
        _ => Err(mismatch(entry, "a float")),
    }
}

/// Decodes a full-width bit pattern into the host's integer category,
/// truncating to the host width. Signed hosts sign-extend.
fn int_value(entry: &PlanEntry, host: &Host, bits: u64) -> Result<Value> {
    if let Host::Bool = host {
        return Ok(Value::Bool(bits != 0));
    }
    match host.int_spec() {
        Some((width, true)) => Ok(Value::Int(sign_extend(bits & width_mask(width), width))),
        Some((width, false)) => Ok(Value::Uint(bits & width_mask(width))),
        None => Err(mismatch(entry, "an integer")),
    }
}

fn skip_bytes<R: Read>(r: &mut R, n: usize) -> Result<()> {
    let mut remaining = n;
    let mut buf = [0u8; 64];
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        r.read_exact(&mut buf[..chunk]).map_err(Error::from_io)?;
        remaining -= chunk;
    }
    Ok(())
}
