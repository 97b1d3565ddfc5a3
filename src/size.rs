//! Size calculation: the exact byte count a pack would produce, without
//! writing anything.

use crate::custom;
use crate::errors::{Error, Result};
use crate::options::Options;
use crate::pack::{mismatch, nested_schema, resolve_len, seq_elements};
use crate::plan::{Plan, PlanEntry};
use crate::schema::Host;
use crate::value::{Record, Value};
use crate::wire::WireType;

pub(crate) fn size_of_record(plan: &Plan, record: &Record, opts: &Options) -> Result<usize> {
    if !std::sync::Arc::ptr_eq(plan.schema(), record.schema()) {
        return Err(Error::InvalidArgument(format!(
            "record of type `{}` does not match plan `{}`",
            record.schema().name(),
            plan.schema().name()
        )));
    }
    let mut size = 0;
    for (i, entry) in plan.entries().iter().enumerate() {
        if entry.skip {
            continue;
        }
        if entry.sizeof.is_some() {
            size += entry.wire.size();
            continue;
        }
        let len = resolve_len(entry, record)?;
        size += size_of_value(entry, record.value_at(i), len, opts)?;
    }
    Ok(size)
}

fn size_of_value(
    entry: &PlanEntry,
    value: &Value,
    len: Option<usize>,
    opts: &Options,
) -> Result<usize> {
    match entry.wire {
        WireType::Pad => Ok(len.unwrap_or(1)),
        WireType::Struct => size_of_struct(entry, value, len, opts),
        WireType::Custom => match value {
            Value::Custom(codec) => Ok(codec.size(opts)),
            Value::Null => match entry.host {
                Host::Custom(tag) => Ok(custom::instantiate(tag)?.size(opts)),
                _ => Err(mismatch(entry, "a custom value")),
            },
            _ => Err(mismatch(entry, "a custom value")),
        },
        WireType::String => size_of_string(entry, value, len),
        _ => match &entry.host {
            Host::Bitmap(_) => Ok(entry.wire.size()),
            Host::Str | Host::Bytes => {
                let stored = value.seq_len().ok_or_else(|| mismatch(entry, "bytes"))?;
                Ok(len.unwrap_or(stored))
            }
            Host::Seq(_) => {
                let elems = seq_elements(entry, value)?;
                Ok(entry.wire.size() * len.unwrap_or(elems.len()))
            }
            _ => Ok(entry.wire.size()),
        },
    }
}

fn size_of_struct(
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
        let mut size = 0;
        for index in 0..count {
            let element = match elems.get(index) {
                Some(Value::Struct(record)) => record,
                Some(Value::Null) | None => &zero,
                Some(_) => return Err(mismatch(entry, "a sequence of records")),
            };
            size += size_of_record(&plan, element, opts)?;
        }
        Ok(size)
    } else {
        match value {
            Value::Struct(record) => size_of_record(&plan, record, opts),
            Value::Null => size_of_record(&plan, &Record::new(schema), opts),
            _ => Err(mismatch(entry, "a nested record")),
        }
    }
}

fn size_of_string(entry: &PlanEntry, value: &Value, len: Option<usize>) -> Result<usize> {
    if entry.slice {
        let elems = seq_elements(entry, value)?;
        let count = len.unwrap_or(elems.len());
        let mut size = 0;
        for index in 0..count {
            let s = match elems.get(index) {
                Some(Value::Str(s)) => s.as_str(),
                Some(Value::Null) | None => "",
                Some(_) => return Err(mismatch(entry, "a sequence of strings")),
            };
            size += s.len() + 1;
        }
        return Ok(size);
    }
    let s = match value {
        Value::Str(s) => s.as_str(),
        Value::Null => "",
        _ => return Err(mismatch(entry, "a string")),
    };
    Ok(match len {
        Some(l) => l,
        None => s.len() + entry.null_terminated as usize,
    })
}
