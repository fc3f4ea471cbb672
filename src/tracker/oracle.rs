//! Consumed contract for the external byte-level taint engine.
//!
//! The oracle's internal propagation algorithm is out of scope here; the
//! engine only ever asks it two questions:
//!
//! - label a memory range just read from a source, tagged with that
//!   source's index, and say how many bytes were actually labeled;
//! - for a memory range about to land in a sink, report how many bytes
//!   carry each label, plus the physical tainted byte count.
//!
//! Both calls are best-effort. A disabled oracle or an inaccessible range
//! yields zero / empty results, never an error; the accounting engine
//! additionally clamps every reported count to the event length.

use std::collections::BTreeMap;

/// Result of querying a written memory range for taint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    /// Label (source index) -> number of bytes in the range carrying it.
    /// A byte carrying several labels contributes to each of its entries.
    pub per_label: BTreeMap<u32, u32>,
    /// Number of physical bytes in the range carrying at least one label,
    /// each byte counted once however many labels it carries.
    pub tainted_bytes: u32,
}

impl RangeQuery {
    /// The empty result, returned while the oracle is disabled.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any byte in the queried range was tainted.
    #[inline]
    pub fn is_tainted(&self) -> bool {
        self.tainted_bytes > 0
    }
}

/// The external taint engine, as seen by the accounting engine.
///
/// `process` disambiguates address spaces when several monitored processes
/// share one session; single-process oracles may ignore it.
pub trait TaintOracle {
    /// Turn labeling and querying on. Called once, when the session's
    /// activation threshold is reached. Idempotent.
    fn enable(&mut self);

    /// Whether the oracle is currently labeling.
    fn is_enabled(&self) -> bool;

    /// Label `len` bytes at `addr` with `label`, returning the number of
    /// bytes actually labeled. Best-effort: returns less than `len` when
    /// part of the range is inaccessible, and 0 when disabled.
    fn label_range(&mut self, process: u64, addr: u64, len: u32, label: u32) -> u32;

    /// Query `len` bytes at `addr` for labels. Returns
    /// [`RangeQuery::empty`] when disabled.
    fn query_range(&self, process: u64, addr: u64, len: u32) -> RangeQuery;
}
