//! Бенчмарки горячего пути захвата: квантование, сериализация заголовка,
//! буферизированная запись выборок.

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use holter_capture::{calibrate_mv, quantize_mv};
use holter_core::{BufferedWriter, SessionWriter};
use holter_types::{EcgSample, FileHeader};

fn bench_quantization(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantization");
    group.throughput(Throughput::Elements(1_000));

    // Тысяча калибровок+квантований — один «тик-секундный» пакет при 250 Гц
    // на 4 значения (I, II, III, производное)
    group.bench_function("calibrate_and_quantize_1k", |b| {
        b.iter(|| {
            let mut acc = 0i32;
            for i in 0..1_000u32 {
                let raw_v = 1.0 + (i as f32) * 0.001;
                let mv = calibrate_mv(black_box(raw_v));
                acc += quantize_mv(mv) as i32;
            }
            black_box(acc)
        })
    });

    group.finish();
}

fn bench_header_serialization(c: &mut Criterion) {
    let mut header = FileHeader::new(1, 1_704_067_200, 1_704_067_200, 250, 0);
    header.num_ecg_samples = 3_750;
    let bytes = header.serialize();

    c.bench_function("header_serialize", |b| {
        b.iter(|| black_box(black_box(&header).serialize()))
    });

    c.bench_function("header_deserialize", |b| {
        b.iter(|| FileHeader::deserialize(black_box(&bytes)).unwrap())
    });
}

fn bench_buffered_writes(c: &mut Criterion) {
    let sample = EcgSample {
        lead_i: 6_553,
        lead_ii: 13_107,
        lead_iii: 6_553,
    };

    let mut group = c.benchmark_group("write_path");
    // 3750 выборок — окно 15 с при 250 Гц
    group.throughput(Throughput::Elements(3_750));

    group.bench_function("buffered_append_session", |b| {
        b.iter(|| {
            let mut writer = BufferedWriter::new(Vec::with_capacity(32 * 1024), 8_192);
            for _ in 0..3_750 {
                writer.append(black_box(&sample.to_bytes()));
            }
            let (inner, _) = writer.into_inner();
            black_box(inner)
        })
    });

    group.bench_function("session_writer_full_cycle", |b| {
        b.iter(|| {
            let header = FileHeader::new(1, 100, 100, 250, 0);
            let cursor = Cursor::new(Vec::with_capacity(32 * 1024));
            let mut writer = SessionWriter::new(cursor, header, 8_192).unwrap();
            for _ in 0..3_750 {
                writer.write_ecg(black_box(&sample)).unwrap();
            }
            let (header, cursor) = writer.finish().unwrap();
            black_box((header.num_ecg_samples, cursor.into_inner().len()))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_quantization,
    bench_header_serialization,
    bench_buffered_writes
);
criterion_main!(benches);
