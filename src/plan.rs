//! Field plans: schemas compiled into the form the codec engines execute.
//!
//! Compilation parses every directive, fills in default wire types, resolves
//! `sizeof`/`sizefrom` names to positional indices and records the reverse
//! link from a size carrier onto the field it describes. A compiled plan is
//! immutable and cached process-wide per record type; the cache is
//! read-mostly, written once on first use.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::errors::{Error, Result};
use crate::schema::{Host, Schema};
use crate::tag::Tag;
use crate::wire::{ByteOrder, WireType};

/// How the effective length of a field is found at pack/unpack time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    /// No length of its own: scalars, or sequences governed by their own
    /// in-memory length.
    None,
    /// Fixed element count from a `[N]` directive.
    Fixed(usize),
    /// Element count read from another field of the same record.
    From {
        field: usize,
        /// Set when the link was inferred from a `sizeof` carrier. Packing
        /// then trusts the data length rather than the stored integer.
        derived: bool,
    },
}

/// One compiled field.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub name: String,
    pub host: Host,
    pub wire: WireType,
    pub order: Option<ByteOrder>,
    pub len: Len,
    pub slice: bool,
    /// Index of the field whose length this integer carries on the wire.
    pub sizeof: Option<usize>,
    pub null_terminated: bool,
    pub skip: bool,
}

/// A compiled record type: entries in declaration order.
#[derive(Debug)]
pub struct Plan {
    schema: Arc<Schema>,
    entries: Vec<PlanEntry>,
}

enum Link {
    Sizeof(String),
    Sizefrom(String),
}

impl Plan {
    /// Returns the cached plan for `schema`, compiling on first use.
    pub fn of(schema: &Arc<Schema>) -> Result<Arc<Plan>> {
        let key = Arc::as_ptr(schema) as usize;
        {
            let map = cache().read().unwrap_or_else(PoisonError::into_inner);
            if let Some(plan) = map.get(&key) {
                return Ok(plan.clone());
            }
        }
        let plan = Arc::new(Plan::compile(schema)?);
        let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(key).or_insert(plan).clone())
    }

    pub fn compile(schema: &Arc<Schema>) -> Result<Plan> {
        let mut entries = Vec::with_capacity(schema.fields().len());
        let mut links: Vec<(usize, Link)> = Vec::new();

        for (i, field) in schema.fields().iter().enumerate() {
            let tag = match &field.directive {
                Some(directive) => Tag::parse(directive)?,
                None => Tag::default(),
            };
            if tag.skip {
                entries.push(PlanEntry {
                    name: field.name.clone(),
                    host: field.host.clone(),
                    wire: WireType::Pad,
                    order: None,
                    len: Len::None,
                    slice: false,
                    sizeof: None,
                    null_terminated: false,
                    skip: true,
                });
                continue;
            }
            let wire = resolve_wire(&field.name, &field.host, &tag)?;
            if let Some(name) = tag.sizeof {
                links.push((i, Link::Sizeof(name)));
            }
            if let Some(name) = tag.sizefrom {
                links.push((i, Link::Sizefrom(name)));
            }
            entries.push(PlanEntry {
                name: field.name.clone(),
                host: field.host.clone(),
                wire,
                order: tag.order,
                len: match tag.len {
                    Some(n) => Len::Fixed(n),
                    None => Len::None,
                },
                slice: matches!(field.host, Host::Seq(_) | Host::Bytes),
                sizeof: None,
                null_terminated: tag.null_terminated,
                skip: false,
            });
        }

        for (i, link) in links {
            match link {
                Link::Sizefrom(name) => {
                    let target = resolve_name(schema, &name)?;
                    if target >= i {
                        return Err(Error::InvalidArgument(format!(
                            "`{}` reads its length from `{name}`, which must come first",
                            entries[i].name
                        )));
                    }
                    if !schema.fields()[target].host.is_integer() {
                        return Err(Error::InvalidArgument(format!(
                            "sizefrom target `{name}` is not an integer field"
                        )));
                    }
                    entries[i].len = Len::From {
                        field: target,
                        derived: false,
                    };
                }
                Link::Sizeof(name) => {
                    let target = resolve_name(schema, &name)?;
                    if target <= i {
                        return Err(Error::InvalidArgument(format!(
                            "sizeof carrier `{}` must come before `{name}`",
                            entries[i].name
                        )));
                    }
                    if !schema.fields()[i].host.is_integer() {
                        return Err(Error::InvalidArgument(format!(
                            "sizeof field `{}` is not an integer field",
                            entries[i].name
                        )));
                    }
                    if !schema.fields()[target].host.has_len() {
                        return Err(Error::InvalidArgument(format!(
                            "sizeof target `{name}` has no length to record"
                        )));
                    }
                    entries[i].sizeof = Some(target);
                    // Reverse link: the target learns where its unpack-time
                    // length lives, unless it already names one.
                    if entries[target].len == Len::None {
                        entries[target].len = Len::From {
                            field: i,
                            derived: true,
                        };
                    }
                }
            }
        }

        Ok(Plan {
            schema: schema.clone(),
            entries,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }
}

fn resolve_name(schema: &Schema, name: &str) -> Result<usize> {
    schema.index_of(name).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "`{name}` is not a field of `{}`",
            schema.name()
        ))
    })
}

fn resolve_wire(field: &str, host: &Host, tag: &Tag) -> Result<WireType> {
    let wire = match tag.wire {
        Some(wire) => wire,
        None => host.default_wire().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "bitmap field `{field}` requires an integer wire type"
            ))
        })?,
    };
    if matches!(host, Host::Bitmap(_)) && !wire.is_integer() {
        return Err(Error::InvalidArgument(format!(
            "bitmap field `{field}` requires an integer wire type"
        )));
    }
    if !compatible(host, wire) {
        return Err(Error::TypeMismatch(format!(
            "field `{field}`: wire type {wire:?} does not fit a {} host",
            host.label()
        )));
    }
    Ok(wire)
}

fn compatible(host: &Host, wire: WireType) -> bool {
    if wire == WireType::Pad {
        return true;
    }
    match host {
        Host::Bool
        | Host::I8
        | Host::I16
        | Host::I32
        | Host::I64
        | Host::U8
        | Host::U16
        | Host::U32
        | Host::U64 => wire.is_integer() || wire == WireType::Bool,
        Host::F32 | Host::F64 => matches!(wire, WireType::Float32 | WireType::Float64),
        Host::Str => matches!(
            wire,
            WireType::String | WireType::Uint8 | WireType::Int8
        ),
        Host::Bytes => matches!(wire, WireType::Uint8 | WireType::Int8),
        Host::Seq(inner) => compatible(inner, wire),
        Host::Struct(_) => wire == WireType::Struct,
        Host::Bitmap(_) => wire.is_integer(),
        Host::Custom(_) => wire == WireType::Custom,
    }
}

fn cache() -> &'static RwLock<HashMap<usize, Arc<Plan>>> {
    static CACHE: OnceLock<RwLock<HashMap<usize, Arc<Plan>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}
