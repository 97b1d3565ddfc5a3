//! Property tests: round-trip fidelity, size agreement and endian swapping
//! over generated records.

use std::sync::{Arc, OnceLock};

use proptest::prelude::*;

use bytecraft::{
    pack, pack_with_order, sizeof, unpack, unpack_with_order, Bitmap, ByteOrder, Host, Record,
    Schema, SymbolMap, Value,
};

fn scalar_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("Scalars")
            .field("b", Host::Bool)
            .field("i8", Host::I8)
            .field_as("i16", Host::I16, "little")
            .field_as("i32", Host::I32, "big")
            .field("i64", Host::I64)
            .field("u8", Host::U8)
            .field_as("u16", Host::U16, "big")
            .field_as("u32", Host::U32, "little")
            .field("u64", Host::U64)
            .field("f32", Host::F32)
            .field_as("f64", Host::F64, "little")
            .build()
    })
}

fn sized_schema() -> &'static Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder("Sized")
            .field_as("text_len", Host::U16, "sizeof=text,big")
            .field("text", Host::Str)
            .field_as("data_len", Host::U8, "sizeof=data")
            .field("data", Host::Bytes)
            .field_as("words_len", Host::U8, "sizeof=words")
            .field_as("words", Host::Seq(Box::new(Host::U16)), "little")
            .build()
    })
}

fn flag_map() -> &'static Arc<SymbolMap> {
    static MAP: OnceLock<Arc<SymbolMap>> = OnceLock::new();
    MAP.get_or_init(|| {
        Arc::new(SymbolMap::bitmap([
            ("ALPHA", 0u64),
            ("BETA", 1),
            ("GAMMA", 2),
            ("DELTA", 3),
            ("EPSILON", 4),
        ]))
    })
}

proptest! {
    #[test]
    fn round_trip_scalars(
        b in any::<bool>(),
        i8v in any::<i8>(),
        i16v in any::<i16>(),
        i32v in any::<i32>(),
        i64v in any::<i64>(),
        u8v in any::<u8>(),
        u16v in any::<u16>(),
        u32v in any::<u32>(),
        u64v in any::<u64>(),
        f32v in any::<f32>(),
        f64v in any::<f64>(),
    ) {
        let record = Record::new(scalar_schema())
            .with("b", Value::Bool(b))
            .with("i8", Value::Int(i8v as i64))
            .with("i16", Value::Int(i16v as i64))
            .with("i32", Value::Int(i32v as i64))
            .with("i64", Value::Int(i64v))
            .with("u8", Value::Uint(u8v as u64))
            .with("u16", Value::Uint(u16v as u64))
            .with("u32", Value::Uint(u32v as u64))
            .with("u64", Value::Uint(u64v))
            .with("f32", Value::F32(f32v))
            .with("f64", Value::F64(f64v));
        let mut buf = Vec::new();
        let written = pack(&mut buf, &record).unwrap();
        prop_assert_eq!(written, buf.len());
        prop_assert_eq!(sizeof(&record).unwrap(), buf.len());

        let mut out = Record::new(scalar_schema());
        unpack(&mut buf.as_slice(), &mut out).unwrap();
        // Float bit patterns survive; NaN still compares unequal, so compare
        // through bits for the float slots.
        let bits = |record: &Record, name: &str| match record.get(name) {
            Some(Value::F32(f)) => f.to_bits() as u64,
            Some(Value::F64(f)) => f.to_bits(),
            _ => unreachable!(),
        };
        prop_assert_eq!(bits(&out, "f32"), bits(&record, "f32"));
        prop_assert_eq!(bits(&out, "f64"), bits(&record, "f64"));
        for name in ["b", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64"] {
            prop_assert_eq!(out.get(name), record.get(name));
        }
    }

    #[test]
    fn round_trip_sized_fields(
        text in "[a-zA-Z0-9 ]{0,50}",
        data in proptest::collection::vec(any::<u8>(), 0..40),
        words in proptest::collection::vec(any::<u16>(), 0..20),
    ) {
        let record = Record::new(sized_schema())
            .with("text_len", Value::Uint(text.len() as u64))
            .with("text", Value::Str(text))
            .with("data_len", Value::Uint(data.len() as u64))
            .with("data", Value::Bytes(data))
            .with("words_len", Value::Uint(words.len() as u64))
            .with(
                "words",
                Value::Seq(words.into_iter().map(|w| Value::Uint(w as u64)).collect()),
            );
        let mut buf = Vec::new();
        let written = pack(&mut buf, &record).unwrap();
        prop_assert_eq!(sizeof(&record).unwrap(), written);

        let mut out = Record::new(sized_schema());
        unpack(&mut buf.as_slice(), &mut out).unwrap();
        prop_assert_eq!(out, record);
    }

    #[test]
    fn sizeof_carrier_ignores_stale_value(stale in any::<u8>(), len in 0usize..30) {
        let text = "x".repeat(len);
        let record = Record::new(sized_schema())
            .with("text_len", Value::Uint(stale as u64))
            .with("text", Value::Str(text));
        let mut buf = Vec::new();
        pack(&mut buf, &record).unwrap();
        // Big-endian u16 carrier holds the data length, not the stale value.
        prop_assert_eq!(&buf[..2], &[0, len as u8][..]);
    }

    #[test]
    fn endian_swap_mirrors_multibyte_fields(v in any::<u32>()) {
        let schema = scalar_schema();
        let record = Record::new(schema).with("u32", Value::Uint(v as u64));
        let mut buf = Vec::new();
        pack_with_order(&mut buf, &record, ByteOrder::Big).unwrap();
        let mut out = Record::new(schema);
        unpack_with_order(&mut buf.as_slice(), &mut out, ByteOrder::Little).unwrap();
        prop_assert_eq!(out.get("u32"), Some(&Value::Uint(v.swap_bytes() as u64)));
    }

    #[test]
    fn bitmap_subset_round_trips(bits in 0u32..32) {
        let names = ["ALPHA", "BETA", "GAMMA", "DELTA", "EPSILON"];
        let subset: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        let bitmap = Bitmap::from_symbols(subset);
        let value = bitmap.value(flag_map()).unwrap();
        prop_assert_eq!(value, bits as u64);
        prop_assert_eq!(Bitmap::from_value(value, flag_map()), bitmap);
    }
}
