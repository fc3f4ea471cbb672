//! depflow - byte-level data-flow dependency tracking between I/O endpoints.
//!
//! This library accounts how much of the data written to designated "sink"
//! endpoints (files, network peers) originated from designated "source"
//! endpoints, as observed during a monitored program's execution inside an
//! external dynamic-instrumentation environment. Provenance is decided by an
//! external byte-level taint oracle; depflow owns the endpoint identity
//! model, the registry, and the accounting engine that turns an ordered I/O
//! event stream into a source→sink dependency matrix.
//!
//! # Architecture
//!
//! - **Targets** ([`target`]): closed endpoint identity model (file path /
//!   network peer) with display, validity and total equality contracts
//! - **Tracker** ([`tracker`]): the accounting core — registry, per-endpoint
//!   counters, the event-driven engine and its activation state machine,
//!   plus the consumed oracle and resolver contracts
//! - **Config** ([`config`]): session setup — ordered endpoint lists and the
//!   activation instruction-count threshold
//! - **Report** ([`report`]): the read-only teardown snapshot handed to the
//!   reporting consumer
//!
//! # Quick Start
//!
//! ```no_run
//! use depflow::{DependencyEngine, IoEvent, SessionConfig, TableResolver, Target};
//! # use depflow::{RangeQuery, TaintOracle};
//! # struct HostOracle;
//! # impl TaintOracle for HostOracle {
//! #     fn enable(&mut self) {}
//! #     fn is_enabled(&self) -> bool { true }
//! #     fn label_range(&mut self, _: u64, _: u64, len: u32, _: u32) -> u32 { len }
//! #     fn query_range(&self, _: u64, _: u64, _: u32) -> RangeQuery { RangeQuery::empty() }
//! # }
//!
//! let config = SessionConfig::new()
//!     .source(Target::file("/tmp/in"))
//!     .sink(Target::network("10.0.0.2", 9000))
//!     .activate_at(1_000_000);
//!
//! let mut resolver = TableResolver::new();
//! resolver.bind(1, 3, "/tmp/in");
//!
//! let mut engine = DependencyEngine::new(config, HostOracle, resolver)?;
//!
//! // Driven by the host instrumentation:
//! engine.observe_translation(1_500_000);
//! engine.handle_event(IoEvent::read(1, 3, 0x1000, 4096));
//!
//! let report = engine.finish();
//! println!("{}", report.to_json()?);
//! # Ok::<(), depflow::DepflowError>(())
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod target;
pub mod tracker;

pub use config::SessionConfig;
pub use error::{DepflowError, Result};
pub use report::{SessionReport, SinkReport, SourceReport};
pub use target::Target;
pub use tracker::{
    Activation, DependencyEngine, EndpointResolver, IoEvent, IoKind, RangeQuery, SessionFlags,
    TableResolver, TaintOracle, TargetRegistry, TargetSink, TargetSource,
};
