//! # bytecraft
//!
//! Declarative binary serialization of structured records.
//!
//! Record types are described once as a [Schema]: fields in declaration
//! order, each with a host kind and an optional layout directive (wire type,
//! `[N]`/`[]` counts, `big`/`little`, `sizeof=`/`sizefrom=` length links,
//! `null-terminated`, `skip`). The schema compiles into an immutable field
//! plan on first use, and the generic engine packs and unpacks [Record]
//! values against any `Write`/`Read`, round-tripping faithfully.
//!
//! ## Example
//!
//! ```
//! use bytecraft::{Host, Record, Schema, Value};
//!
//! let greeting = Schema::builder("Greeting")
//!     .field_as("len", Host::U8, "sizeof=text")
//!     .field("text", Host::Str)
//!     .build();
//!
//! let record = Record::new(&greeting).with("text", Value::Str("hi".into()));
//!
//! let mut wire = Vec::new();
//! let written = bytecraft::pack(&mut wire, &record)?;
//! assert_eq!(wire, [2, b'h', b'i']);
//! assert_eq!(written, bytecraft::sizeof(&record)?);
//!
//! let mut out = Record::new(&greeting);
//! bytecraft::unpack(&mut wire.as_slice(), &mut out)?;
//! assert_eq!(out.get("text"), Some(&Value::Str("hi".into())));
//! # Ok::<(), bytecraft::Error>(())
//! ```
//!
//! Byte order resolves per field: a `pack_with_order`/`unpack_with_order`
//! argument dominates a directive's `big`/`little`, which dominates the
//! big-endian default. The codec keeps no state between calls; compiled
//! plans are cached per record type and safe to share across threads.

pub mod bitmap;
pub mod custom;
pub mod errors;
pub mod options;
pub mod plan;
pub mod schema;
pub mod tag;
pub mod value;
pub mod wire;

mod pack;
mod size;
mod unpack;

pub use bitmap::{Bitmap, SymbolMap};
pub use custom::{register_custom, CustomCodec, CustomFactory};
pub use errors::{Error, Result};
pub use options::Options;
pub use schema::{FieldDef, Host, Schema, SchemaBuilder};
pub use value::{Record, Value};
pub use wire::{ByteOrder, WireType};

use std::io::{Read, Write};

use plan::Plan;

/// Packs `record` into `w`, returning the number of bytes written.
pub fn pack<W: Write>(w: &mut W, record: &Record) -> Result<usize> {
    pack_with_options(w, record, &Options::default())
}

/// Packs with a byte order that overrides every per-field directive.
pub fn pack_with_order<W: Write>(w: &mut W, record: &Record, order: ByteOrder) -> Result<usize> {
    pack_with_options(w, record, &Options::with_order(order))
}

pub fn pack_with_options<W: Write>(w: &mut W, record: &Record, opts: &Options) -> Result<usize> {
    let plan = Plan::of(record.schema())?;
    pack::pack_record(w, &plan, record, opts)
}

/// Unpacks bytes from `r` into `record`, which must be of the same schema
/// used to pack them. On error the record may be partially written.
pub fn unpack<R: Read>(r: &mut R, record: &mut Record) -> Result<()> {
    unpack_with_options(r, record, &Options::default())
}

/// Unpacks with a byte order that overrides every per-field directive.
pub fn unpack_with_order<R: Read>(
    r: &mut R,
    record: &mut Record,
    order: ByteOrder,
) -> Result<()> {
    unpack_with_options(r, record, &Options::with_order(order))
}

pub fn unpack_with_options<R: Read>(
    r: &mut R,
    record: &mut Record,
    opts: &Options,
) -> Result<()> {
    let plan = Plan::of(record.schema())?;
    unpack::unpack_record(r, &plan, record, opts)
}

/// Returns the exact byte count [pack] would produce for `record`.
pub fn sizeof(record: &Record) -> Result<usize> {
    sizeof_with_options(record, &Options::default())
}

pub fn sizeof_with_options(record: &Record, opts: &Options) -> Result<usize> {
    let plan = Plan::of(record.schema())?;
    size::size_of_record(&plan, record, opts)
}
