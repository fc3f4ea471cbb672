//! Dependency accounting engine.
//!
//! The engine is the single entry point the host instrumentation drives:
//! one ordered stream of I/O events plus a coarse translation-unit tick.
//! Per event it resolves the handle to an identity, matches it against the
//! frozen registry, and on a match updates the endpoint's counters — and,
//! once taint tracking is active, consults the oracle to label source reads
//! and attribute sink writes back to source indices.
//!
//! Event handling cannot fail: unresolved handles and unmatched identities
//! are silent no-ops (most observed I/O is irrelevant to the configured
//! endpoints), and oracle results are accepted best-effort, clamped to the
//! event length. Each event's effect is applied fully or not at all.
//!
//! # Activation
//!
//! Taint tracking starts `Inactive` and flips to `Active` exactly once,
//! when the executed-instruction count reported through
//! [`DependencyEngine::observe_translation`] reaches the configured
//! threshold. The check is coarse by contract: the transition may land up
//! to one translation unit after the exact threshold instruction, never
//! before, and never reverts.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::report::SessionReport;
use crate::tracker::oracle::TaintOracle;
use crate::tracker::registry::TargetRegistry;
use crate::tracker::resolve::EndpointResolver;

// =============================================================================
// Events
// =============================================================================

/// Kind of an observed I/O event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoKind {
    /// An endpoint was opened. Carries no payload.
    Open,
    /// Data was read from an endpoint into `[addr, addr + len)`.
    Read,
    /// Data was written to an endpoint from `[addr, addr + len)`.
    Write,
}

/// One observed I/O event, as decoded by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoEvent {
    /// Key of the monitored process the event belongs to.
    pub process: u64,
    /// Process-scoped I/O handle (file descriptor, socket, ...).
    pub handle: i64,
    pub kind: IoKind,
    /// Virtual address of the transfer buffer.
    pub addr: u64,
    /// Transfer length in bytes.
    pub len: u32,
    /// File offset for positional variants (pread/pwrite). Accepted but not
    /// semantically required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl IoEvent {
    /// An open event for `handle` in `process`.
    pub fn open(process: u64, handle: i64) -> Self {
        Self {
            process,
            handle,
            kind: IoKind::Open,
            addr: 0,
            len: 0,
            offset: None,
        }
    }

    /// A read of `len` bytes into `addr`.
    pub fn read(process: u64, handle: i64, addr: u64, len: u32) -> Self {
        Self {
            process,
            handle,
            kind: IoKind::Read,
            addr,
            len,
            offset: None,
        }
    }

    /// A write of `len` bytes from `addr`.
    pub fn write(process: u64, handle: i64, addr: u64, len: u32) -> Self {
        Self {
            process,
            handle,
            kind: IoKind::Write,
            addr,
            len,
            offset: None,
        }
    }

    /// Attach a positional-I/O offset.
    pub fn at_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Taint-tracking activation state. One-way: `Inactive` -> `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Inactive,
    Active,
}

/// Session-wide first-occurrence flags. Set once, never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFlags {
    /// A registered source was opened.
    pub saw_open_of_source: bool,
    /// A registered source was read from.
    pub saw_read_of_source: bool,
    /// A registered sink was written to.
    pub saw_write_of_sink: bool,
}

// =============================================================================
// Engine
// =============================================================================

/// Accounts byte-level source→sink dependencies over one monitoring session.
///
/// Single-threaded by design: the engine is driven synchronously from one
/// ordered event stream reflecting the monitored program's execution order,
/// so no locking exists anywhere. State is process-agnostic — counts are
/// session-wide unions across all monitored processes.
pub struct DependencyEngine<O, R> {
    registry: TargetRegistry,
    oracle: O,
    resolver: R,
    activation: Activation,
    activation_threshold: u64,
    /// Latest executed-instruction count reported by the host. Log context
    /// only; the engine takes no decisions from it besides activation.
    instr_count: u64,
    flags: SessionFlags,
    debug: bool,
}

impl<O: TaintOracle, R: EndpointResolver> DependencyEngine<O, R> {
    /// Build an engine from a session config.
    ///
    /// Registers every configured endpoint in order and freezes the
    /// registry, so any configuration error surfaces here, before the first
    /// event. A threshold of zero activates the oracle immediately.
    pub fn new(config: SessionConfig, oracle: O, resolver: R) -> Result<Self> {
        config.validate()?;

        let mut registry = TargetRegistry::new();
        for target in &config.sources {
            registry.register_source(target.clone())?;
        }
        for target in &config.sinks {
            registry.register_sink(target.clone())?;
        }
        registry.freeze();

        let mut engine = Self {
            registry,
            oracle,
            resolver,
            activation: Activation::Inactive,
            activation_threshold: config.activation_threshold,
            instr_count: 0,
            flags: SessionFlags::default(),
            debug: config.debug,
        };
        engine.check_activation();
        Ok(engine)
    }

    /// Called by the host on every new unit of translated code, with the
    /// current executed-instruction count.
    ///
    /// Activation granularity is exactly this call's granularity: the
    /// engine activates on the first tick whose count reaches the
    /// threshold, which may be up to one translation unit past the exact
    /// threshold instruction but never before it.
    pub fn observe_translation(&mut self, instr_count: u64) {
        self.instr_count = instr_count;
        self.check_activation();
    }

    fn check_activation(&mut self) {
        if self.activation == Activation::Active {
            return;
        }
        if self.instr_count >= self.activation_threshold {
            self.oracle.enable();
            self.activation = Activation::Active;
            info!(
                target: "depflow",
                instr_count = self.instr_count,
                threshold = self.activation_threshold,
                "taint tracking activated"
            );
        }
    }

    /// Current activation state.
    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.activation == Activation::Active
    }

    /// The frozen endpoint registry.
    #[inline]
    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// The session's first-occurrence flags.
    #[inline]
    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    /// Process one observed I/O event.
    ///
    /// Infallible: events that resolve to nothing or match no registered
    /// endpoint are no-ops.
    pub fn handle_event(&mut self, event: IoEvent) {
        let Some(identity) = self.resolver.resolve(event.process, event.handle) else {
            trace!(
                target: "depflow",
                process = event.process,
                handle = event.handle,
                "unresolvable handle, ignoring event"
            );
            return;
        };
        match event.kind {
            IoKind::Open => self.on_open(&identity),
            IoKind::Read => self.on_read(&identity, event.process, event.addr, event.len),
            IoKind::Write => self.on_write(&identity, event.process, event.addr, event.len),
        }
    }

    fn on_open(&mut self, identity: &str) {
        if self.registry.match_source(identity).is_none() {
            return;
        }
        // Open carries no payload; only the session flag moves.
        self.flags.saw_open_of_source = true;
        self.log_match("open", identity);
    }

    fn on_read(&mut self, identity: &str, process: u64, addr: u64, len: u32) {
        let Some(index) = self.registry.match_source(identity) else {
            return;
        };

        let labeled = if self.is_active() {
            self.oracle.label_range(process, addr, len, index).min(len)
        } else {
            0
        };

        // Registered indices always have a row; keep the lookup fallible
        // anyway rather than indexing.
        if let Some(source) = self.registry.source_mut(index) {
            source.record_read(len);
            source.record_labeled(labeled);
        }
        self.flags.saw_read_of_source = true;
        self.log_match("read", identity);
    }

    fn on_write(&mut self, identity: &str, process: u64, addr: u64, len: u32) {
        let Some(index) = self.registry.match_sink(identity) else {
            return;
        };

        let source_count = self.registry.sources().len() as u32;
        let mut per_source = Vec::new();
        let mut tainted = 0;
        if self.is_active() {
            let query = self.oracle.query_range(process, addr, len);
            // A clean range needs no attribution at all.
            if query.is_tainted() {
                per_source = query
                    .per_label
                    .into_iter()
                    .filter(|&(label, bytes)| {
                        if label >= source_count {
                            // Stale or foreign label with no registered source.
                            trace!(target: "depflow", label, "ignoring unknown taint label");
                            return false;
                        }
                        bytes > 0
                    })
                    .map(|(label, bytes)| (label, bytes.min(len)))
                    .collect();
                tainted = query.tainted_bytes.min(len);
            }
        }

        if let Some(sink) = self.registry.sink_mut(index) {
            sink.record_write(len);
            sink.record_taint(per_source, tainted);
        }
        self.flags.saw_write_of_sink = true;
        self.log_match("write", identity);
    }

    fn log_match(&self, event: &str, identity: &str) {
        if self.debug {
            debug!(
                target: "depflow",
                instr_count = self.instr_count,
                "saw {} of \"{}\"",
                event,
                identity
            );
        } else {
            trace!(
                target: "depflow",
                instr_count = self.instr_count,
                "saw {} of \"{}\"",
                event,
                identity
            );
        }
    }

    /// End the session: hand the frozen registry and all accounting state
    /// to the reporting consumer, read-only, and release the engine.
    pub fn finish(self) -> SessionReport {
        SessionReport::from_session(&self.registry, self.flags, self.is_active())
    }
}

// =============================================================================
// Tests
// =============================================================================
