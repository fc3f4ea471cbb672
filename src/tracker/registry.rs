//! Two-phase endpoint registry.
//!
//! A session builds its registry once, in caller-supplied order, then
//! freezes it before the first event. Registration assigns dense, stable
//! indices (0, 1, 2, ...) per side; after the freeze the registry is
//! append-proof and every lookup is O(1). Indices are the only
//! cross-reference used anywhere else, so no lifetime coupling exists
//! between the source and sink lists.
//!
//! Registration failures (invalid target, duplicate identity, post-freeze
//! append) are fatal configuration errors raised before the session starts.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{DepflowError, Result};
use crate::target::Target;
use crate::tracker::types::{TargetSink, TargetSource};

/// Append-then-freeze collection of tracked endpoints.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    sources: Vec<TargetSource>,
    sinks: Vec<TargetSink>,
    /// Display identity -> source index, for matching resolved identities.
    source_ids: FxHashMap<String, u32>,
    /// Display identity -> sink index.
    sink_ids: FxHashMap<String, u32>,
    frozen: bool,
}

impl TargetRegistry {
    /// Create an empty registry in the build phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source endpoint, returning its index.
    pub fn register_source(&mut self, target: Target) -> Result<u32> {
        if self.frozen {
            return Err(DepflowError::RegistryFrozen("source"));
        }
        let identity = Self::validated_identity(&target, "source")?;
        if self.source_ids.contains_key(&identity) {
            return Err(DepflowError::DuplicateTarget {
                side: "source",
                identity,
            });
        }
        let index = self.sources.len() as u32;
        debug!(target: "depflow", index, %identity, "registered source");
        self.source_ids.insert(identity, index);
        self.sources.push(TargetSource::new(target, index));
        Ok(index)
    }

    /// Register a sink endpoint, returning its index.
    pub fn register_sink(&mut self, target: Target) -> Result<u32> {
        if self.frozen {
            return Err(DepflowError::RegistryFrozen("sink"));
        }
        let identity = Self::validated_identity(&target, "sink")?;
        if self.sink_ids.contains_key(&identity) {
            return Err(DepflowError::DuplicateTarget {
                side: "sink",
                identity,
            });
        }
        let index = self.sinks.len() as u32;
        debug!(target: "depflow", index, %identity, "registered sink");
        self.sink_ids.insert(identity, index);
        self.sinks.push(TargetSink::new(target, index));
        Ok(index)
    }

    /// End the build phase. Further registration is rejected.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the build phase has ended.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Match a resolved identity string against the source list.
    #[inline]
    pub fn match_source(&self, identity: &str) -> Option<u32> {
        self.source_ids.get(identity).copied()
    }

    /// Match a resolved identity string against the sink list.
    #[inline]
    pub fn match_sink(&self, identity: &str) -> Option<u32> {
        self.sink_ids.get(identity).copied()
    }

    /// Source accounting row by index.
    #[inline]
    pub fn source(&self, index: u32) -> Option<&TargetSource> {
        self.sources.get(index as usize)
    }

    /// Sink accounting row by index.
    #[inline]
    pub fn sink(&self, index: u32) -> Option<&TargetSink> {
        self.sinks.get(index as usize)
    }

    pub(crate) fn source_mut(&mut self, index: u32) -> Option<&mut TargetSource> {
        self.sources.get_mut(index as usize)
    }

    pub(crate) fn sink_mut(&mut self, index: u32) -> Option<&mut TargetSink> {
        self.sinks.get_mut(index as usize)
    }

    /// Sources in registration order.
    #[inline]
    pub fn sources(&self) -> &[TargetSource] {
        &self.sources
    }

    /// Sinks in registration order.
    #[inline]
    pub fn sinks(&self) -> &[TargetSink] {
        &self.sinks
    }

    fn validated_identity(target: &Target, side: &'static str) -> Result<String> {
        if !target.is_valid() {
            return Err(DepflowError::InvalidTarget(format!(
                "{} {} target",
                side,
                target.kind()
            )));
        }
        Ok(target.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
