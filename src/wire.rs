//! The primitive wire type table and byte-order helpers.
//!
//! Every multi-byte scalar that crosses the wire goes through [ByteOrder];
//! widths come from the fixed [WireType] table. Endianness is orthogonal to
//! the type.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

/// Wire-level primitive types.
///
/// `String` and `Pad` count one byte per element; `Struct` and `Custom` have
/// no intrinsic size of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Pad,
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Struct,
    Custom,
}

impl WireType {
    /// Wire size of a single element in bytes.
    pub fn size(self) -> usize {
        match self {
            WireType::Pad
            | WireType::Bool
            | WireType::Int8
            | WireType::Uint8
            | WireType::String => 1,
            WireType::Int16 | WireType::Uint16 => 2,
            WireType::Int32 | WireType::Uint32 | WireType::Float32 => 4,
            WireType::Int64 | WireType::Uint64 | WireType::Float64 => 8,
            WireType::Struct | WireType::Custom => 0,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            WireType::Int8
                | WireType::Uint8
                | WireType::Int16
                | WireType::Uint16
                | WireType::Int32
                | WireType::Uint32
                | WireType::Int64
                | WireType::Uint64
        )
    }

    pub(crate) fn is_signed(self) -> bool {
        matches!(
            self,
            WireType::Int8 | WireType::Int16 | WireType::Int32 | WireType::Int64
        )
    }

    /// Looks up a directive type token. `byte` is an alias for `uint8`.
    pub(crate) fn from_token(token: &str) -> Option<WireType> {
        Some(match token {
            "pad" => WireType::Pad,
            "bool" => WireType::Bool,
            "int8" => WireType::Int8,
            "byte" | "uint8" => WireType::Uint8,
            "int16" => WireType::Int16,
            "uint16" => WireType::Uint16,
            "int32" => WireType::Int32,
            "uint32" => WireType::Uint32,
            "int64" => WireType::Int64,
            "uint64" => WireType::Uint64,
            "float32" => WireType::Float32,
            "float64" => WireType::Float64,
            "string" => WireType::String,
            _ => return None,
        })
    }
}

/// Byte order for multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Writes the low `nbytes` bytes of `value` in this order.
    pub(crate) fn write_uint<W: Write>(self, w: &mut W, value: u64, nbytes: usize) -> io::Result<()> {
        let v = value & width_mask(nbytes * 8);
        match self {
            ByteOrder::Big => w.write_uint::<BigEndian>(v, nbytes),
            ByteOrder::Little => w.write_uint::<LittleEndian>(v, nbytes),
        }
    }

    pub(crate) fn read_uint<R: Read>(self, r: &mut R, nbytes: usize) -> io::Result<u64> {
        match self {
            ByteOrder::Big => r.read_uint::<BigEndian>(nbytes),
            ByteOrder::Little => r.read_uint::<LittleEndian>(nbytes),
        }
    }

    pub(crate) fn write_f32<W: Write>(self, w: &mut W, value: f32) -> io::Result<()> {
        match self {
            ByteOrder::Big => w.write_f32::<BigEndian>(value),
            ByteOrder::Little => w.write_f32::<LittleEndian>(value),
        }
    }

    pub(crate) fn write_f64<W: Write>(self, w: &mut W, value: f64) -> io::Result<()> {
        match self {
            ByteOrder::Big => w.write_f64::<BigEndian>(value),
            ByteOrder::Little => w.write_f64::<LittleEndian>(value),
        }
    }

    pub(crate) fn read_f32<R: Read>(self, r: &mut R) -> io::Result<f32> {
        match self {
            ByteOrder::Big => r.read_f32::<BigEndian>(),
            ByteOrder::Little => r.read_f32::<LittleEndian>(),
        }
    }

    pub(crate) fn read_f64<R: Read>(self, r: &mut R) -> io::Result<f64> {
        match self {
            ByteOrder::Big => r.read_f64::<BigEndian>(),
            ByteOrder::Little => r.read_f64::<LittleEndian>(),
        }
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub(crate) fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// All-ones mask covering the low `bits` bits.
pub(crate) fn width_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sizes() {
        assert_eq!(WireType::Pad.size(), 1);
        assert_eq!(WireType::Bool.size(), 1);
        assert_eq!(WireType::Uint16.size(), 2);
        assert_eq!(WireType::Float32.size(), 4);
        assert_eq!(WireType::Int64.size(), 8);
        assert_eq!(WireType::String.size(), 1);
        assert_eq!(WireType::Struct.size(), 0);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0xFFFF_FFFF, 32), -1);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }

    #[test]
    fn test_write_uint_masks_to_width() {
        let mut buf = Vec::new();
        ByteOrder::Big.write_uint(&mut buf, 0x1_0203, 2).unwrap();
        assert_eq!(buf, [0x02, 0x03]);
    }

    #[test]
    fn test_uint_round_trip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut buf = Vec::new();
            order.write_uint(&mut buf, 0xA1B2C3, 4).unwrap();
            let back = order.read_uint(&mut buf.as_slice(), 4).unwrap();
            assert_eq!(back, 0xA1B2C3);
        }
    }

    #[test]
    fn test_token_lookup() {
        assert_eq!(WireType::from_token("uint16"), Some(WireType::Uint16));
        assert_eq!(WireType::from_token("byte"), Some(WireType::Uint8));
        assert_eq!(WireType::from_token("pad"), Some(WireType::Pad));
        assert_eq!(WireType::from_token("void"), None);
    }
}
