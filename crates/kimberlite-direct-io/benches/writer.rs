//! Direct writer benchmarks.
//!
//! Measures append throughput for aligned and misaligned sources, plus the
//! cost of the cache-passing flush tail.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kimberlite_direct_io::{AlignedBuffer, DirectFile, DirectIoOptions, MemoryHandle};

const BLOCK: usize = 4096;

fn memory_file() -> DirectFile<MemoryHandle> {
    DirectFile::from_handle(MemoryHandle::new(BLOCK), &DirectIoOptions::default()).unwrap()
}

// ============================================================================
// Append Benchmarks
// ============================================================================

fn bench_append_aligned(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_aligned");

    for size in [4096, 16384, 65536] {
        group.throughput(Throughput::Bytes(size as u64));
        let data = AlignedBuffer::from_data(&vec![0xA5u8; size], BLOCK);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                memory_file,
                |mut file| {
                    let _ = black_box(file.write(black_box(data.as_slice())));
                    file
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_append_misaligned(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_misaligned");

    for size in [64, 1024, 4096, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        let padded = AlignedBuffer::from_data(&vec![0x5Au8; size + 1], BLOCK);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                memory_file,
                |mut file| {
                    let _ = black_box(file.write(black_box(&padded.as_slice()[1..])));
                    file
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Flush Benchmarks
// ============================================================================

fn bench_flush_tail(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush_tail");

    for tail in [1, 512, 4095] {
        let data = vec![0x3Cu8; tail];

        group.bench_with_input(BenchmarkId::from_parameter(tail), &tail, |b, _| {
            b.iter_batched(
                || {
                    let mut file = memory_file();
                    file.write(&data).unwrap();
                    file
                },
                |mut file| {
                    let _ = black_box(file.flush());
                    file
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_append_aligned,
    bench_append_misaligned,
    bench_flush_tail
);
criterion_main!(benches);
