// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure

//! End-to-end loss and repair between a `ReliableWriter` and a
//! `ReliableReader` sharing one fault-injecting intra-process transport.
//!
//! Test scenarios:
//! - Seeded random loss on every submessage kind, repaired by rounds of
//!   HEARTBEAT -> ACKNACK -> retransmit
//! - A sequence number that is always dropped stays requested forever
//! - A sample evicted from history is skipped once the heartbeat moves past it

use std::sync::Arc;

use crossbeam::channel::Receiver;
use hdds_reliability::{
    DropReason, FaultConfig, FaultInjectingTransport, Guid, IntraProcessTransport, Locator,
    ReliableReader, ReliableWriter, ReliableWriterConfig, Sample, SequenceNumber,
};

type FaultyTransport = FaultInjectingTransport<IntraProcessTransport>;

const WRITER_GUID: Guid = Guid::new([0x11; 12], [0, 0, 1, 0x02]);
const READER_GUID: Guid = Guid::new([0x22; 12], [0, 0, 1, 0x07]);

fn sn(v: u64) -> SequenceNumber {
    SequenceNumber::from_u64(v)
}

struct Link {
    transport: Arc<FaultyTransport>,
    writer: ReliableWriter<FaultyTransport>,
    reader: ReliableReader<FaultyTransport>,
    to_writer: Receiver<Vec<u8>>,
    to_reader: Receiver<Vec<u8>>,
    delivered: Vec<Sample>,
}

impl Link {
    fn new(fault: FaultConfig, writer_config: ReliableWriterConfig) -> Self {
        let transport = Arc::new(FaultInjectingTransport::new(
            IntraProcessTransport::new(),
            fault,
        ));
        let w_loc = Locator::shm(7410);
        let r_loc = Locator::shm(7411);
        let to_writer = transport
            .inner()
            .open_input_channel(&w_loc)
            .expect("writer input");
        let to_reader = transport
            .inner()
            .open_input_channel(&r_loc)
            .expect("reader input");

        let writer = ReliableWriter::new(
            WRITER_GUID,
            Arc::clone(&transport),
            w_loc,
            r_loc,
            writer_config,
        )
        .expect("writer");
        let reader = ReliableReader::new(
            READER_GUID,
            WRITER_GUID,
            Arc::clone(&transport),
            r_loc,
            w_loc,
        )
        .expect("reader");

        Self {
            transport,
            writer,
            reader,
            to_writer,
            to_reader,
            delivered: Vec::new(),
        }
    }

    /// Deliver everything queued on both sides until both queues are empty.
    fn pump(&mut self) {
        loop {
            let mut moved = false;
            while let Ok(packet) = self.to_reader.try_recv() {
                let samples = self.reader.on_packet(&packet).expect("reader packet");
                self.delivered.extend(samples);
                moved = true;
            }
            while let Ok(packet) = self.to_writer.try_recv() {
                self.writer.on_packet(&packet).expect("writer packet");
                moved = true;
            }
            if !moved {
                break;
            }
        }
    }

    /// One repair round: HEARTBEAT, then whatever it triggers.
    fn round(&mut self) {
        self.writer.send_heartbeat().expect("heartbeat");
        self.pump();
    }

    fn delivered_sns(&self) -> Vec<u64> {
        self.delivered.iter().map(|s| s.sn.to_u64()).collect()
    }
}

#[test]
fn test_random_loss_is_repaired() {
    let mut link = Link::new(
        FaultConfig::new().drop_percentage(30).random_seed(0x5eed),
        ReliableWriterConfig::default(),
    );

    for i in 1..=20u8 {
        link.writer.write(&[i; 16]).expect("write");
    }
    link.pump();

    let mut rounds = 0;
    while !(link.delivered.len() == 20 && link.writer.is_fully_acknowledged()) {
        assert!(rounds < 500, "no convergence, delivered {:?}", link.delivered_sns());
        link.round();
        rounds += 1;
    }

    assert_eq!(link.delivered_sns(), (1..=20).collect::<Vec<_>>());
    for sample in &link.delivered {
        assert_eq!(sample.payload, vec![sample.sn.to_u64() as u8; 16]);
    }
    assert!(link.transport.drop_log().total_dropped() > 0);
    assert!(link.writer.metrics().snapshot().retransmit_sent > 0);
}

#[test]
fn test_always_dropped_sn_stays_requested() {
    let mut link = Link::new(
        FaultConfig::new().drop_sequence_number(sn(2)),
        ReliableWriterConfig::default(),
    );
    for i in 1..=4u8 {
        link.writer.write(&[i]).expect("write");
    }
    link.pump();
    assert_eq!(link.delivered_sns(), vec![1]);

    for _ in 0..5 {
        link.round();
    }

    assert_eq!(link.delivered_sns(), vec![1]);
    assert_eq!(link.reader.highest_contiguous(), sn(1));
    assert!(link.reader.missing().contains(sn(2)));
    assert!(!link.writer.is_fully_acknowledged());

    let log = link.transport.drop_log();
    assert_eq!(log.total_dropped(), 6);
    assert!(log
        .entries()
        .iter()
        .all(|r| r.reason == DropReason::SequenceNumber && r.writer_sn == Some(sn(2))));
}

#[test]
fn test_evicted_sample_is_skipped() {
    let mut link = Link::new(
        FaultConfig::new().drop_sequence_number(sn(1)),
        ReliableWriterConfig::default().history_depth(2),
    );
    for i in 1..=3u8 {
        link.writer.write(&[i]).expect("write");
    }
    link.pump();
    assert!(link.delivered.is_empty());

    // HEARTBEAT(first=2, last=3): the reader gives up on 1.
    link.round();
    assert_eq!(link.delivered_sns(), vec![2, 3]);
    assert_eq!(link.reader.highest_contiguous(), sn(3));

    link.round();
    assert!(link.writer.is_fully_acknowledged());
}
