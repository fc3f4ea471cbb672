//! Session configuration.
//!
//! A [`SessionConfig`] names the endpoints to track, in order (the order
//! becomes each endpoint's index), and the instruction-count threshold at
//! which taint tracking activates. Configs deserialize from JSON or build
//! up programmatically; either way they are validated once, when the engine
//! is constructed, and a bad config aborts the session before any event is
//! processed.

use serde::{Deserialize, Serialize};

use crate::error::{DepflowError, Result};
use crate::target::Target;

/// Default activation threshold: active from the first translation unit.
fn default_threshold() -> u64 {
    0
}

/// Configuration for one monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Source endpoints, in registration order.
    pub sources: Vec<Target>,
    /// Sink endpoints, in registration order.
    pub sinks: Vec<Target>,
    /// Executed-instruction count at which taint tracking turns on.
    /// 0 means active from the start; `u64::MAX` means never.
    #[serde(default = "default_threshold")]
    pub activation_threshold: u64,
    /// Log matched events at debug level instead of trace.
    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// An empty config, active from the start.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            sinks: Vec::new(),
            activation_threshold: 0,
            debug: false,
        }
    }

    /// Add a source endpoint.
    pub fn source(mut self, target: Target) -> Self {
        self.sources.push(target);
        self
    }

    /// Add a sink endpoint.
    pub fn sink(mut self, target: Target) -> Self {
        self.sinks.push(target);
        self
    }

    /// Add a source from a descriptor string (`/path` or `ip::port`).
    pub fn source_descriptor(mut self, descriptor: &str) -> Result<Self> {
        self.sources.push(descriptor.parse()?);
        Ok(self)
    }

    /// Add a sink from a descriptor string.
    pub fn sink_descriptor(mut self, descriptor: &str) -> Result<Self> {
        self.sinks.push(descriptor.parse()?);
        Ok(self)
    }

    /// Set the activation threshold.
    pub fn activate_at(mut self, instruction_count: u64) -> Self {
        self.activation_threshold = instruction_count;
        self
    }

    /// Keep taint tracking off for the whole session; only plain byte and
    /// event counters accumulate.
    pub fn never_activate(mut self) -> Self {
        self.activation_threshold = u64::MAX;
        self
    }

    /// Enable debug-level event logging.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the config shape before registration.
    ///
    /// Registration performs the per-target checks (validity, duplicates);
    /// this catches the session-level mistake of tracking nothing at all.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() && self.sinks.is_empty() {
            return Err(DepflowError::Config(
                "no source or sink endpoints configured".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
