// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence Set Benchmark
//!
//! Measures the hot paths of ACKNACK construction:
//! - Filling a 256-bit `SequenceNumberSet` at various densities
//! - Iterating the set numbers
//! - `GapTracker::missing_set` with scattered holes
//! - Fault classification cost per send

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_reliability::protocol::PacketBuilder;
use hdds_reliability::{
    DataMsg, FaultConfig, FaultInjectingTransport, GapTracker, IntraProcessTransport, Locator,
    SequenceNumber, SequenceNumberSet, Transport, ENTITYID_UNKNOWN_READER,
};
use std::hint::black_box as bb;

const BASE: SequenceNumber = SequenceNumber::new(0, u32::MAX - 100);

/// Benchmark set insertion with every `stride`-th slot set
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_set_fill");

    for stride in [1u32, 4, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, &stride| {
            b.iter(|| {
                let mut set = SequenceNumberSet::new(BASE);
                let mut offset = 0;
                while offset < 256 {
                    set.add(BASE + offset);
                    offset += stride;
                }
                bb(set)
            });
        });
    }

    group.finish();
}

/// Benchmark ascending iteration over a full and a sparse set
fn bench_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_set_iter");

    let mut full = SequenceNumberSet::new(BASE);
    full.add_range(BASE, BASE + 256);
    let mut sparse = SequenceNumberSet::new(BASE);
    for offset in [0u32, 63, 64, 200, 255] {
        sparse.add(BASE + offset);
    }

    group.bench_function("full", |b| b.iter(|| bb(&full).iter().count()));
    group.bench_function("sparse", |b| b.iter(|| bb(&sparse).iter().count()));
    group.finish();
}

/// Benchmark missing-set construction on the reader
fn bench_missing_set(c: &mut Criterion) {
    let mut tracker = GapTracker::new();
    for v in (1..=1000u64).filter(|v| v % 7 != 0) {
        tracker.on_receive(SequenceNumber::from_u64(v));
    }
    let last = SequenceNumber::from_u64(1000);

    c.bench_function("gap_tracker_missing_set", |b| {
        b.iter(|| bb(tracker.missing_set(bb(last))));
    });
}

/// Benchmark send cost through the fault decorator
fn bench_fault_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("fault_send");

    let packet = PacketBuilder::new([1; 12])
        .data(&DataMsg::new(
            ENTITYID_UNKNOWN_READER,
            [0, 0, 1, 0x02],
            SequenceNumber::from_u64(42),
            vec![0xAB; 256],
        ))
        .build();
    let local = Locator::shm(1);
    let remote = Locator::shm(2);

    let configs = [
        ("passthrough", FaultConfig::default()),
        ("drop_seq", FaultConfig::new().drop_sequence_number(SequenceNumber::from_u64(42))),
        ("random_50", FaultConfig::new().drop_percentage(50).random_seed(1)),
    ];
    for (name, config) in configs {
        let transport = FaultInjectingTransport::new(IntraProcessTransport::new(), config);
        transport.open_output_channel(&local).expect("open");
        group.bench_function(name, |b| {
            b.iter(|| transport.send(bb(&packet), &local, &remote).expect("send"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fill,
    bench_iter,
    bench_missing_set,
    bench_fault_send
);
criterion_main!(benches);
