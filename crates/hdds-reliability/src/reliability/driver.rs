// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliable writer/reader endpoints over any [`Transport`].
//!
//! ```text
//! ReliableWriter                             ReliableReader
//!   write() --- DATA ------------------------> on_packet()
//!   send_heartbeat() --- HEARTBEAT ----------> on_packet()
//!   on_packet() <------------------ ACKNACK --- (missing set)
//!   (retransmit DATA / GAP) -----------------> on_packet()
//! ```
//!
//! Neither endpoint owns a receive loop: the caller feeds incoming
//! datagrams to `on_packet`. Periodic heartbeats can be driven by
//! [`HeartbeatScheduler`](super::HeartbeatScheduler).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::reader::{AckNackTx, GapRx, HeartbeatRx};
use super::writer::{GapTx, HeartbeatTx, WriterRetransmitHandler, DEFAULT_JITTER_PCT};
use super::{
    AckNackMsg, DataMsg, GapTracker, HistoryCache, ReceiveOutcome, ReliableMetrics,
    SeqNumGenerator, SequenceNumber, SequenceNumberSet,
};
use crate::config::{DEFAULT_HEARTBEAT_PERIOD_MS, DEFAULT_HISTORY_DEPTH, INITIAL_SEQUENCE_NUMBER};
use crate::guid::{Guid, ENTITYID_UNKNOWN_READER};
use crate::protocol::{parse_packet, PacketBuilder, Submessage};
use crate::transport::{Locator, Transport};
use crate::{Error, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Reliable writer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliableWriterConfig {
    /// KEEP_LAST depth of the retransmission history.
    pub history_depth: usize,
    pub heartbeat_period: Duration,
    /// Heartbeat period jitter, percent (0-100).
    pub heartbeat_jitter_pct: u8,
    /// First sequence number assigned.
    pub initial_sequence: u64,
}

impl Default for ReliableWriterConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            heartbeat_period: Duration::from_millis(DEFAULT_HEARTBEAT_PERIOD_MS),
            heartbeat_jitter_pct: DEFAULT_JITTER_PCT,
            initial_sequence: INITIAL_SEQUENCE_NUMBER,
        }
    }
}

impl ReliableWriterConfig {
    #[must_use]
    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    #[must_use]
    pub fn heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    #[must_use]
    pub fn heartbeat_jitter(mut self, pct: u8) -> Self {
        self.heartbeat_jitter_pct = pct;
        self
    }

    #[must_use]
    pub fn initial_sequence(mut self, initial: u64) -> Self {
        self.initial_sequence = initial;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_depth == 0 {
            return Err(Error::InvalidConfig("history_depth must be > 0".into()));
        }
        if self.heartbeat_period.is_zero() {
            return Err(Error::InvalidConfig("heartbeat_period must be > 0".into()));
        }
        if self.heartbeat_jitter_pct > 100 {
            return Err(Error::InvalidConfig(format!(
                "heartbeat_jitter_pct {} exceeds 100",
                self.heartbeat_jitter_pct
            )));
        }
        if self.initial_sequence == 0 {
            return Err(Error::InvalidConfig(
                "initial_sequence must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Writer side of a reliable stream.
pub struct ReliableWriter<T: Transport> {
    guid: Guid,
    transport: Arc<T>,
    local: Locator,
    remote: Locator,
    seq_gen: SeqNumGenerator,
    cache: HistoryCache,
    /// Keeps sequence assignment and history insertion in the same order.
    write_lock: Mutex<()>,
    heartbeat: Mutex<HeartbeatTx>,
    gap_tx: Mutex<GapTx>,
    /// Highest number acknowledged by the reader (everything below ACKNACK base).
    acked: Mutex<SequenceNumber>,
    metrics: Arc<ReliableMetrics>,
}

impl<T: Transport> ReliableWriter<T> {
    /// Create a writer sending from `local` to `remote`; opens the output channel.
    pub fn new(
        guid: Guid,
        transport: Arc<T>,
        local: Locator,
        remote: Locator,
        config: ReliableWriterConfig,
    ) -> Result<Self> {
        config.validate()?;
        transport.open_output_channel(&local)?;
        log::debug!(
            "[reliable] writer {} created {} -> {} depth={}",
            guid,
            local,
            remote,
            config.history_depth
        );

        let seq_gen = SeqNumGenerator::with_initial(config.initial_sequence);
        let acked = SequenceNumber::from_u64(config.initial_sequence - 1);
        Ok(Self {
            guid,
            transport,
            local,
            remote,
            seq_gen,
            cache: HistoryCache::new(config.history_depth),
            write_lock: Mutex::new(()),
            heartbeat: Mutex::new(HeartbeatTx::with_period(
                config.heartbeat_period,
                config.heartbeat_jitter_pct,
            )),
            gap_tx: Mutex::new(GapTx::with_entity_ids(
                ENTITYID_UNKNOWN_READER,
                guid.entity_id,
            )),
            acked: Mutex::new(acked),
            metrics: Arc::new(ReliableMetrics::new()),
        })
    }

    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<ReliableMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Last sequence number assigned, if any.
    #[must_use]
    pub fn last_sequence(&self) -> Option<SequenceNumber> {
        self.seq_gen.last_assigned()
    }

    /// Highest sequence number the reader has acknowledged.
    #[must_use]
    pub fn acknowledged(&self) -> SequenceNumber {
        *self.acked.lock()
    }

    /// True once the reader acknowledged every sample written so far.
    #[must_use]
    pub fn is_fully_acknowledged(&self) -> bool {
        match self.last_sequence() {
            Some(last) => self.acknowledged() >= last,
            None => true,
        }
    }

    /// Assign the next sequence number, store the sample and send DATA.
    ///
    /// The sample stays in history even if the send fails, so it can still
    /// be repaired.
    pub fn write(&self, payload: &[u8]) -> Result<SequenceNumber> {
        let sn = {
            let _guard = self.write_lock.lock();
            let sn = self.seq_gen.next();
            self.cache.insert(sn, payload);
            sn
        };
        self.send_data(sn, payload)?;
        Ok(sn)
    }

    fn send_data(&self, sn: SequenceNumber, payload: &[u8]) -> Result<()> {
        let msg = DataMsg::new(
            ENTITYID_UNKNOWN_READER,
            self.guid.entity_id,
            sn,
            payload.to_vec(),
        );
        let packet = PacketBuilder::new(self.guid.prefix).data(&msg).build();
        self.transport.send(&packet, &self.local, &self.remote)
    }

    /// Announce the available range `[oldest, last]`.
    pub fn send_heartbeat(&self) -> Result<()> {
        let last = self.seq_gen.current() - 1;
        let first = self.cache.oldest_seq().unwrap_or(last + 1);

        let hb = self.heartbeat.lock().build_heartbeat(
            ENTITYID_UNKNOWN_READER,
            self.guid.entity_id,
            first,
            last,
        );
        let packet = PacketBuilder::new(self.guid.prefix).heartbeat(&hb).build();
        self.transport.send(&packet, &self.local, &self.remote)?;
        self.metrics.increment_heartbeats_sent(1);
        log::trace!(
            "[reliable] writer {} HEARTBEAT first={} last={} count={}",
            self.guid,
            first,
            last,
            hb.count
        );
        Ok(())
    }

    /// Next instant a periodic heartbeat is due.
    #[must_use]
    pub fn next_heartbeat_deadline(&self) -> Instant {
        self.heartbeat.lock().next_deadline()
    }

    /// Skip the current heartbeat period.
    pub fn skip_heartbeat(&self) {
        self.heartbeat.lock().reschedule();
    }

    /// Send a heartbeat if one is due; returns whether one was sent.
    pub fn poll_heartbeat(&self, now: Instant) -> Result<bool> {
        if !self.heartbeat.lock().is_due(now) {
            return Ok(false);
        }
        self.send_heartbeat()?;
        Ok(true)
    }

    /// Handle an ACKNACK: record the acknowledgement, retransmit what is
    /// still in history, and GAP the rest.
    ///
    /// Returns the number of samples retransmitted.
    pub fn on_acknack(&self, acknack: &AckNackMsg) -> Result<usize> {
        if acknack.writer_id != self.guid.entity_id {
            return Ok(0);
        }

        let acked_up_to = acknack.reader_sn_state.base() - 1;
        {
            let mut acked = self.acked.lock();
            if acked_up_to > *acked {
                *acked = acked_up_to;
            }
        }

        let plan = {
            let mut gap_tx = self.gap_tx.lock();
            WriterRetransmitHandler::new(&self.cache, &mut gap_tx, &self.metrics)
                .on_acknack(acknack)
        };

        for (sn, payload) in &plan.retransmits {
            log::debug!("[reliable] writer {} retransmit sn={}", self.guid, sn);
            self.send_data(*sn, payload)?;
        }
        if !plan.gaps.is_empty() {
            let packet = plan
                .gaps
                .iter()
                .fold(PacketBuilder::new(self.guid.prefix), |b, gap| b.gap(gap))
                .build();
            self.transport.send(&packet, &self.local, &self.remote)?;
        }
        Ok(plan.retransmits.len())
    }

    /// Parse an incoming datagram and apply every ACKNACK addressed to us.
    pub fn on_packet(&self, packet: &[u8]) -> Result<usize> {
        let parsed = parse_packet(packet)?;
        if let Some(why) = parsed.malformed {
            log::debug!("[reliable] writer {} ignoring packet tail: {}", self.guid, why);
        }
        let mut retransmitted = 0;
        for sub in &parsed.submessages {
            if let Submessage::AckNack(acknack) = sub {
                retransmitted += self.on_acknack(acknack)?;
            }
        }
        Ok(retransmitted)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// A sample delivered in writer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub sn: SequenceNumber,
    pub payload: Vec<u8>,
}

struct ReaderState {
    tracker: GapTracker,
    heartbeat_rx: HeartbeatRx,
    gap_rx: GapRx,
    acknack_tx: AckNackTx,
    /// Received but not yet delivered (ahead of a hole, or awaiting flush).
    pending: BTreeMap<SequenceNumber, Vec<u8>>,
    /// Highest number announced by the writer.
    last_available: SequenceNumber,
    /// Numbers requested in the last ACKNACK.
    requested: SequenceNumberSet,
}

/// Reader side of a reliable stream, matched with one writer.
pub struct ReliableReader<T: Transport> {
    guid: Guid,
    writer: Guid,
    transport: Arc<T>,
    local: Locator,
    remote: Locator,
    state: Mutex<ReaderState>,
    metrics: Arc<ReliableMetrics>,
}

impl<T: Transport> ReliableReader<T> {
    /// Create a reader for `writer`; ACKNACKs go from `local` to `remote`.
    pub fn new(
        guid: Guid,
        writer: Guid,
        transport: Arc<T>,
        local: Locator,
        remote: Locator,
    ) -> Result<Self> {
        transport.open_output_channel(&local)?;
        log::debug!("[reliable] reader {} matched writer {}", guid, writer);
        let start = SequenceNumber::from_u64(INITIAL_SEQUENCE_NUMBER);
        Ok(Self {
            guid,
            writer,
            transport,
            local,
            remote,
            state: Mutex::new(ReaderState {
                tracker: GapTracker::new(),
                heartbeat_rx: HeartbeatRx::new(),
                gap_rx: GapRx::new(),
                acknack_tx: AckNackTx::new(guid.entity_id, writer.entity_id),
                pending: BTreeMap::new(),
                last_available: SequenceNumber::from_u64(0),
                requested: SequenceNumberSet::new(start),
            }),
            metrics: Arc::new(ReliableMetrics::new()),
        })
    }

    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<ReliableMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Highest number below which nothing is missing.
    #[must_use]
    pub fn highest_contiguous(&self) -> SequenceNumber {
        self.state.lock().tracker.highest_contiguous()
    }

    /// Numbers known to be missing, as an ACKNACK would request them.
    #[must_use]
    pub fn missing(&self) -> SequenceNumberSet {
        let state = self.state.lock();
        state.tracker.missing_set(state.last_available)
    }

    /// Process one datagram; returns samples now deliverable, in order.
    ///
    /// Replies to fresh HEARTBEATs with an ACKNACK unless the heartbeat is
    /// Final and nothing is missing.
    pub fn on_packet(&self, packet: &[u8]) -> Result<Vec<Sample>> {
        let parsed = parse_packet(packet)?;
        if parsed.guid_prefix != self.writer.prefix {
            return Ok(Vec::new());
        }
        if let Some(why) = parsed.malformed {
            log::debug!("[reliable] reader {} ignoring packet tail: {}", self.guid, why);
        }

        let mut replies = Vec::new();
        let delivered = {
            let mut state = self.state.lock();
            for sub in &parsed.submessages {
                match sub {
                    Submessage::Data(data) if data.writer_id == self.writer.entity_id => {
                        self.on_data(&mut state, data.writer_sn, &data.payload);
                    }
                    Submessage::Heartbeat(hb) if hb.writer_id == self.writer.entity_id => {
                        let ReaderState {
                            tracker,
                            heartbeat_rx,
                            ..
                        } = &mut *state;
                        if !heartbeat_rx.on_heartbeat(hb, tracker) {
                            continue;
                        }
                        if hb.last_sn > state.last_available {
                            state.last_available = hb.last_sn;
                        }
                        let last_available = state.last_available;
                        let ReaderState {
                            tracker,
                            acknack_tx,
                            requested,
                            ..
                        } = &mut *state;
                        let acknack = acknack_tx.build_acknack(tracker, last_available);
                        if hb.final_flag && acknack.final_flag {
                            continue;
                        }
                        *requested = acknack.reader_sn_state;
                        if !acknack.reader_sn_state.is_empty() {
                            self.metrics
                                .record_gap(acknack.reader_sn_state.len() as u64);
                        }
                        replies.push(acknack);
                    }
                    Submessage::Gap(gap) if gap.writer_id == self.writer.entity_id => {
                        let ReaderState {
                            tracker, gap_rx, ..
                        } = &mut *state;
                        for range in gap_rx.on_gap(gap) {
                            tracker.mark_lost(range);
                        }
                    }
                    _ => {}
                }
            }
            Self::flush(&mut state)
        };

        for acknack in &replies {
            self.send_acknack_msg(acknack)?;
        }
        Ok(delivered)
    }

    fn on_data(&self, state: &mut ReaderState, sn: SequenceNumber, payload: &[u8]) {
        let expected = state.tracker.highest_contiguous() + 1;
        match state.tracker.on_receive(sn) {
            ReceiveOutcome::Duplicate => {
                log::trace!("[reliable] reader {} duplicate sn={}", self.guid, sn);
                return;
            }
            ReceiveOutcome::OutOfOrder => {
                self.metrics.increment_out_of_order(1);
                log::debug!(
                    "[reliable] reader {} gap before sn={} (expected {})",
                    self.guid,
                    sn,
                    expected
                );
            }
            ReceiveOutcome::InOrder => {}
        }
        if state.requested.remove(sn) {
            self.metrics.increment_retransmit_received(1);
        }
        if sn > state.last_available {
            state.last_available = sn;
        }
        state.pending.insert(sn, payload.to_vec());
    }

    /// Pop every pending sample at or below the contiguous mark.
    fn flush(state: &mut ReaderState) -> Vec<Sample> {
        let settled = state.tracker.highest_contiguous();
        let mut out = Vec::new();
        while let Some(entry) = state.pending.first_entry() {
            if *entry.key() > settled {
                break;
            }
            let (sn, payload) = entry.remove_entry();
            out.push(Sample { sn, payload });
        }
        out
    }

    /// Send an ACKNACK for the current state regardless of heartbeats.
    pub fn send_acknack(&self) -> Result<()> {
        let acknack = {
            let mut state = self.state.lock();
            let last_available = state.last_available;
            let ReaderState {
                tracker,
                acknack_tx,
                requested,
                ..
            } = &mut *state;
            let acknack = acknack_tx.build_acknack(tracker, last_available);
            *requested = acknack.reader_sn_state;
            acknack
        };
        self.send_acknack_msg(&acknack)
    }

    fn send_acknack_msg(&self, acknack: &AckNackMsg) -> Result<()> {
        let packet = PacketBuilder::new(self.guid.prefix)
            .info_dst(self.writer.prefix)
            .acknack(acknack)
            .build();
        self.transport.send(&packet, &self.local, &self.remote)?;
        self.metrics.increment_acknacks_sent(1);
        log::trace!(
            "[reliable] reader {} ACKNACK base={} missing={} count={}",
            self.guid,
            acknack.reader_sn_state.base(),
            acknack.reader_sn_state.len(),
            acknack.count
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::IntraProcessTransport;
    use crate::GapMsg;
    use crossbeam::channel::Receiver;

    struct Pair {
        writer: ReliableWriter<IntraProcessTransport>,
        reader: ReliableReader<IntraProcessTransport>,
        to_reader: Receiver<Vec<u8>>,
        to_writer: Receiver<Vec<u8>>,
    }

    fn pair(config: ReliableWriterConfig) -> Pair {
        let transport = Arc::new(IntraProcessTransport::new());
        let writer_loc = Locator::shm(10);
        let reader_loc = Locator::shm(20);
        let to_reader = transport.open_input_channel(&reader_loc).expect("input");
        let to_writer = transport.open_input_channel(&writer_loc).expect("input");
        let writer_guid = Guid::new([1; 12], [0, 0, 1, 0x02]);
        let reader_guid = Guid::new([2; 12], [0, 0, 1, 0x07]);
        Pair {
            writer: ReliableWriter::new(
                writer_guid,
                Arc::clone(&transport),
                writer_loc,
                reader_loc,
                config,
            )
            .expect("writer"),
            reader: ReliableReader::new(reader_guid, writer_guid, transport, reader_loc, writer_loc)
                .expect("reader"),
            to_reader,
            to_writer,
        }
    }

    fn drain_into_reader(p: &Pair) -> Vec<SequenceNumber> {
        let mut sns = Vec::new();
        while let Ok(packet) = p.to_reader.try_recv() {
            sns.extend(p.reader.on_packet(&packet).expect("reader").into_iter().map(|s| s.sn));
        }
        sns
    }

    fn drain_into_writer(p: &Pair) -> usize {
        let mut n = 0;
        while let Ok(packet) = p.to_writer.try_recv() {
            n += p.writer.on_packet(&packet).expect("writer");
        }
        n
    }

    fn sn(v: u64) -> SequenceNumber {
        SequenceNumber::from_u64(v)
    }

    #[test]
    fn test_in_order_delivery_and_ack() {
        let p = pair(ReliableWriterConfig::default());
        p.writer.write(b"a").expect("write");
        p.writer.write(b"b").expect("write");
        assert_eq!(drain_into_reader(&p), vec![sn(1), sn(2)]);

        p.writer.send_heartbeat().expect("hb");
        assert!(drain_into_reader(&p).is_empty());
        assert_eq!(drain_into_writer(&p), 0);
        assert!(p.writer.is_fully_acknowledged());
    }

    #[test]
    fn test_lost_sample_repaired() {
        let p = pair(ReliableWriterConfig::default());
        p.writer.write(b"1").expect("write");
        assert_eq!(drain_into_reader(&p), vec![sn(1)]);

        p.writer.write(b"2").expect("write");
        let _lost = p.to_reader.try_recv().expect("sn 2 in flight");
        p.writer.write(b"3").expect("write");
        assert!(drain_into_reader(&p).is_empty());
        assert_eq!(p.reader.missing().iter().collect::<Vec<_>>(), vec![sn(2)]);

        p.writer.send_heartbeat().expect("hb");
        assert!(drain_into_reader(&p).is_empty());
        assert_eq!(drain_into_writer(&p), 1);
        assert_eq!(drain_into_reader(&p), vec![sn(2), sn(3)]);
        assert_eq!(p.reader.metrics().snapshot().retransmit_received, 1);
        assert_eq!(p.writer.metrics().snapshot().retransmit_sent, 1);
    }

    #[test]
    fn test_evicted_sample_gapped() {
        let p = pair(ReliableWriterConfig::default().history_depth(1));
        p.writer.write(b"1").expect("write");
        let _lost = p.to_reader.try_recv().expect("sn 1 in flight");
        p.writer.write(b"2").expect("write");
        assert!(drain_into_reader(&p).is_empty());

        // Heartbeat announces first=2: sn 1 is marked lost on the reader side.
        p.writer.send_heartbeat().expect("hb");
        assert_eq!(drain_into_reader(&p), vec![sn(2)]);
        assert_eq!(p.reader.highest_contiguous(), sn(2));
    }

    #[test]
    fn test_acknack_with_negative_base_ignored() {
        let p = pair(ReliableWriterConfig::default());
        p.writer.write(b"1").expect("write");
        let ack = AckNackMsg::new(
            [0, 0, 1, 0x07],
            [0, 0, 1, 0x02],
            SequenceNumberSet::new(sn(1)),
            1,
        );
        let mut packet = PacketBuilder::new([2; 12]).acknack(&ack).build();
        // RTPS header (20) + submessage header (4) + reader/writer ids (8)
        packet[32..36].copy_from_slice(&i32::MIN.to_le_bytes());

        assert_eq!(p.writer.on_packet(&packet).expect("ignored"), 0);
        assert_eq!(p.writer.acknowledged(), sn(0));
    }

    #[test]
    fn test_huge_gap_settles_in_one_step() {
        let p = pair(ReliableWriterConfig::default());
        let writer_prefix = [1; 12];
        let end = sn(1 + (1u64 << 40));
        let gap = GapMsg::contiguous([0; 4], [0, 0, 1, 0x02], sn(1)..end).expect("non-empty");
        let packet = PacketBuilder::new(writer_prefix).gap(&gap).build();
        assert!(p.reader.on_packet(&packet).expect("gap").is_empty());
        assert_eq!(p.reader.highest_contiguous(), end - 1);

        // A second wide GAP lands ahead of a hole.
        let later = GapMsg::contiguous([0; 4], [0, 0, 1, 0x02], end + 100..end + (1u32 << 31))
            .expect("non-empty");
        let packet = PacketBuilder::new(writer_prefix).gap(&later).build();
        assert!(p.reader.on_packet(&packet).expect("gap").is_empty());
        assert_eq!(p.reader.highest_contiguous(), end - 1);
        assert_eq!(p.reader.missing().base(), end);
    }

    #[test]
    fn test_config_validation() {
        assert!(ReliableWriterConfig::default().validate().is_ok());
        assert!(ReliableWriterConfig::default()
            .history_depth(0)
            .validate()
            .is_err());
        assert!(ReliableWriterConfig::default()
            .heartbeat_period(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ReliableWriterConfig::default()
            .initial_sequence(0)
            .validate()
            .is_err());
    }
}
