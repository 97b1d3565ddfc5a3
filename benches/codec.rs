use std::sync::Arc;

use bytecraft::{pack, unpack, Host, Record, Schema, Value};
use criterion::{criterion_group, criterion_main, Criterion};

fn gen_schema(field_count: usize) -> Arc<Schema> {
    let mut builder = Schema::builder("Bench");
    for i in 0..field_count {
        builder = builder.field_as(format!("f{}", i), Host::U16, "big");
    }
    builder.build()
}

fn gen_record(schema: &Arc<Schema>, field_count: usize) -> Record {
    let mut record = Record::new(schema);
    for i in 0..field_count {
        // Deterministic but non-trivial pattern
        record
            .set(&format!("f{}", i), Value::Uint((i * 31 % 256) as u64))
            .unwrap();
    }
    record
}

fn bench_codec(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let schema = gen_schema(field_count);
        let record = gen_record(&schema, field_count);
        let mut wire = Vec::new();
        pack(&mut wire, &record).unwrap();

        c.bench_function(&format!("pack_{}_fields", field_count), |b| {
            b.iter(|| {
                let mut buf = Vec::with_capacity(wire.len());
                pack(&mut buf, &record).unwrap();
            })
        });

        c.bench_function(&format!("unpack_{}_fields", field_count), |b| {
            b.iter(|| {
                let mut out = Record::new(&schema);
                unpack(&mut wire.as_slice(), &mut out).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
