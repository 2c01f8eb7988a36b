//! Codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use echolite_core::{codec, EchonetObject, Frame, Property, ServiceCode};

fn status_frame() -> Frame {
    Frame::new(EchonetObject::controller(), ServiceCode::GetResponse)
        .with_source(EchonetObject::new(0x01, 0x30, 0x01))
        .with_tid(0x1234)
        .with_properties([
            Property::new(0x80, vec![0x30]),
            Property::new(0xB0, vec![0x42]),
            Property::new(0xB3, vec![0x1A]),
            Property::new(0xBB, vec![0x17]),
        ])
}

fn encode_benchmark(c: &mut Criterion) {
    let frame = status_frame();

    c.bench_function("encode_status_frame", |b| {
        b.iter(|| black_box(codec::encode(&frame).unwrap()))
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let encoded = codec::encode(&status_frame()).unwrap();

    c.bench_function("decode_status_frame", |b| {
        b.iter(|| black_box(codec::decode(&encoded).unwrap()))
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
