//! Teardown report.
//!
//! At session end the engine hands its frozen registry and accounting state
//! to an external reporting consumer as a plain serializable snapshot. The
//! shape and ordering are stable: endpoints appear in registration order and
//! the sink attribution rows are ordered maps, so the JSON form is
//! deterministic across runs with identical event streams.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::target::Target;
use crate::tracker::engine::SessionFlags;
use crate::tracker::registry::TargetRegistry;

/// Read-side statistics for one source endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub index: u32,
    pub target: Target,
    pub total_bytes: u32,
    pub total_reads: u32,
    pub labeled_bytes: u32,
}

/// Write-side statistics for one sink endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkReport {
    pub index: u32,
    pub target: Target,
    pub total_bytes: u32,
    pub total_writes: u32,
    pub total_taint_bytes: u32,
    /// Source index -> bytes written to this sink carrying that source's
    /// label.
    pub labeled_bytes: BTreeMap<u32, u32>,
}

/// Full snapshot of one monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub sources: Vec<SourceReport>,
    pub sinks: Vec<SinkReport>,
    pub flags: SessionFlags,
    /// Whether taint tracking activated before teardown.
    pub activated: bool,
}

impl SessionReport {
    /// Snapshot a finished session.
    pub(crate) fn from_session(
        registry: &TargetRegistry,
        flags: SessionFlags,
        activated: bool,
    ) -> Self {
        let sources = registry
            .sources()
            .iter()
            .map(|s| SourceReport {
                index: s.index(),
                target: s.target().clone(),
                total_bytes: s.total_bytes(),
                total_reads: s.total_reads(),
                labeled_bytes: s.labeled_bytes(),
            })
            .collect();
        let sinks = registry
            .sinks()
            .iter()
            .map(|k| SinkReport {
                index: k.index(),
                target: k.target().clone(),
                total_bytes: k.total_bytes(),
                total_writes: k.total_writes(),
                total_taint_bytes: k.total_taint_bytes(),
                labeled_bytes: k.labeled_bytes().clone(),
            })
            .collect();
        Self {
            sources,
            sinks,
            flags,
            activated,
        }
    }

    /// Bytes the sink at `sink_index` received from the source at
    /// `source_index`. Missing endpoints or absent matrix cells read as
    /// zero.
    pub fn dependency(&self, sink_index: u32, source_index: u32) -> u32 {
        self.sinks
            .iter()
            .find(|k| k.index == sink_index)
            .and_then(|k| k.labeled_bytes.get(&source_index).copied())
            .unwrap_or(0)
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
