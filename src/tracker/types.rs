//! Accounting structures for tracked endpoints.
//!
//! One [`TargetSource`] or [`TargetSink`] exists per registered endpoint and
//! lives in the registry for the whole session. Counters only ever grow, and
//! all mutation funnels through the `record_*` methods so the invariants
//! hold at a single point:
//!
//! - source: `labeled_bytes <= total_bytes`, both non-decreasing
//! - sink: `total_taint_bytes <= total_bytes`, every per-source cell
//!   non-decreasing
//!
//! A sink credits its contributing sources through a map keyed by the plain
//! source index, not a reference back into the source list. Indices are
//! dense and never reused, so the matrix stays valid regardless of how the
//! source list itself is stored or borrowed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::target::Target;

// =============================================================================
// Source Accounting
// =============================================================================

/// Per-source read statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSource {
    /// The endpoint this accounting row belongs to.
    target: Target,
    /// Position in the source list, fixed at registration.
    index: u32,
    /// Bytes read from this source that the oracle labeled.
    labeled_bytes: u32,
    /// Total bytes read from this source.
    total_bytes: u32,
    /// Number of read events against this source.
    total_reads: u32,
}

impl TargetSource {
    /// Create a fresh accounting row for a registered source.
    pub(crate) fn new(target: Target, index: u32) -> Self {
        Self {
            target,
            index,
            labeled_bytes: 0,
            total_bytes: 0,
            total_reads: 0,
        }
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn labeled_bytes(&self) -> u32 {
        self.labeled_bytes
    }

    #[inline]
    pub fn total_bytes(&self) -> u32 {
        self.total_bytes
    }

    #[inline]
    pub fn total_reads(&self) -> u32 {
        self.total_reads
    }

    /// Account one read event of `len` bytes.
    ///
    /// Zero-length reads still count as a read.
    pub(crate) fn record_read(&mut self, len: u32) {
        self.total_bytes = self.total_bytes.saturating_add(len);
        self.total_reads = self.total_reads.saturating_add(1);
    }

    /// Account `n` labeled bytes out of the most recent read.
    ///
    /// Clamped so `labeled_bytes` can never outgrow `total_bytes`, even if
    /// the oracle over-reports.
    pub(crate) fn record_labeled(&mut self, n: u32) {
        self.labeled_bytes = self
            .labeled_bytes
            .saturating_add(n)
            .min(self.total_bytes);
    }
}

// =============================================================================
// Sink Accounting
// =============================================================================

/// Per-sink write statistics, including the per-source attribution matrix row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSink {
    /// The endpoint this accounting row belongs to.
    target: Target,
    /// Position in the sink list, fixed at registration.
    index: u32,
    /// Source index -> bytes written to this sink carrying that source's
    /// label. Absent key means zero.
    labeled_bytes: BTreeMap<u32, u32>,
    /// Total bytes written to this sink.
    total_bytes: u32,
    /// Physical bytes written to this sink carrying at least one source
    /// label, each byte counted once regardless of how many sources it is
    /// attributed to.
    total_taint_bytes: u32,
    /// Number of write events against this sink.
    total_writes: u32,
}

impl TargetSink {
    /// Create a fresh accounting row for a registered sink.
    pub(crate) fn new(target: Target, index: u32) -> Self {
        Self {
            target,
            index,
            labeled_bytes: BTreeMap::new(),
            total_bytes: 0,
            total_taint_bytes: 0,
            total_writes: 0,
        }
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The full attribution row: source index -> labeled byte count.
    #[inline]
    pub fn labeled_bytes(&self) -> &BTreeMap<u32, u32> {
        &self.labeled_bytes
    }

    /// Bytes attributed to one source. Absent entries read as zero.
    #[inline]
    pub fn labeled_from(&self, source_index: u32) -> u32 {
        self.labeled_bytes.get(&source_index).copied().unwrap_or(0)
    }

    #[inline]
    pub fn total_bytes(&self) -> u32 {
        self.total_bytes
    }

    #[inline]
    pub fn total_taint_bytes(&self) -> u32 {
        self.total_taint_bytes
    }

    #[inline]
    pub fn total_writes(&self) -> u32 {
        self.total_writes
    }

    /// Account one write event of `len` bytes.
    ///
    /// Zero-length writes still count as a write.
    pub(crate) fn record_write(&mut self, len: u32) {
        self.total_bytes = self.total_bytes.saturating_add(len);
        self.total_writes = self.total_writes.saturating_add(1);
    }

    /// Account taint attribution for the most recent write.
    ///
    /// `per_source` holds clamped per-source byte counts; `tainted_bytes`
    /// is the physical tainted byte count for the written range, already
    /// clamped to the event length by the engine.
    pub(crate) fn record_taint(
        &mut self,
        per_source: impl IntoIterator<Item = (u32, u32)>,
        tainted_bytes: u32,
    ) {
        for (source, bytes) in per_source {
            if bytes == 0 {
                continue;
            }
            let cell = self.labeled_bytes.entry(source).or_insert(0);
            *cell = cell.saturating_add(bytes);
        }
        self.total_taint_bytes = self
            .total_taint_bytes
            .saturating_add(tainted_bytes)
            .min(self.total_bytes);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_counters_start_at_zero() {
        let s = TargetSource::new(Target::file("/tmp/in"), 0);
        assert_eq!(s.index(), 0);
        assert_eq!(s.total_bytes(), 0);
        assert_eq!(s.total_reads(), 0);
        assert_eq!(s.labeled_bytes(), 0);
    }

    #[test]
    fn test_source_read_accounting() {
        let mut s = TargetSource::new(Target::file("/tmp/in"), 0);
        s.record_read(100);
        s.record_read(0);
        assert_eq!(s.total_bytes(), 100);
        assert_eq!(s.total_reads(), 2);
    }

    #[test]
    fn test_source_labeled_clamped_to_total() {
        let mut s = TargetSource::new(Target::file("/tmp/in"), 0);
        s.record_read(50);
        s.record_labeled(80); // oracle over-reports
        assert_eq!(s.labeled_bytes(), 50);
        assert!(s.labeled_bytes() <= s.total_bytes());
    }

    #[test]
    fn test_sink_write_accounting() {
        let mut k = TargetSink::new(Target::file("/tmp/out"), 0);
        k.record_write(64);
        k.record_write(0);
        assert_eq!(k.total_bytes(), 64);
        assert_eq!(k.total_writes(), 2);
    }

    #[test]
    fn test_sink_attribution_absent_key_is_zero() {
        let k = TargetSink::new(Target::file("/tmp/out"), 0);
        assert_eq!(k.labeled_from(7), 0);
    }

    #[test]
    fn test_sink_attribution_accumulates_per_source() {
        let mut k = TargetSink::new(Target::file("/tmp/out"), 0);
        k.record_write(100);
        k.record_taint([(0, 30), (2, 20)], 50);
        k.record_taint([(0, 10)], 10);
        assert_eq!(k.labeled_from(0), 40);
        assert_eq!(k.labeled_from(1), 0);
        assert_eq!(k.labeled_from(2), 20);
        assert_eq!(k.total_taint_bytes(), 60);
    }

    #[test]
    fn test_sink_zero_count_sources_get_no_entry() {
        let mut k = TargetSink::new(Target::file("/tmp/out"), 0);
        k.record_write(10);
        k.record_taint([(0, 0), (1, 5)], 5);
        assert!(!k.labeled_bytes().contains_key(&0));
        assert_eq!(k.labeled_from(1), 5);
    }

    #[test]
    fn test_sink_taint_clamped_to_total() {
        let mut k = TargetSink::new(Target::file("/tmp/out"), 0);
        k.record_write(10);
        k.record_taint([(0, 10)], 25);
        assert_eq!(k.total_taint_bytes(), 10);
        assert!(k.total_taint_bytes() <= k.total_bytes());
    }
}
