//! Dependency tracking subsystem.
//!
//! Everything needed to account byte-level source→sink dependencies over
//! one monitoring session:
//!
//! 1. **Types** ([`types`]): per-endpoint accounting rows
//!    - `TargetSource`: read-side counters for one source
//!    - `TargetSink`: write-side counters plus the per-source attribution row
//!
//! 2. **Registry** ([`registry`]): the two-phase endpoint collection
//!    - `TargetRegistry`: append-then-freeze, dense stable indices
//!
//! 3. **Oracle** ([`oracle`]): consumed taint-engine contract
//!    - `TaintOracle`: label and query byte ranges
//!    - `RangeQuery`: per-label counts + physical tainted byte count
//!
//! 4. **Resolve** ([`resolve`]): consumed handle-resolution contract
//!    - `EndpointResolver`: process-scoped handle -> identity string
//!    - `TableResolver`: table-backed glue for hosts that decode handle
//!      lifecycles themselves
//!
//! 5. **Engine** ([`engine`]): the event-driven accounting core
//!    - `DependencyEngine`: single `handle_event` entry point, one-way
//!      activation state machine, teardown into a [`crate::report::SessionReport`]
//!
//! # Data Flow
//!
//! ```text
//! host event -> resolver (handle -> identity)
//!            -> registry (identity -> source/sink index)
//!            -> oracle (label on read / query on write, when active)
//!            -> counters and the sink×source matrix
//! ```

pub mod engine;
pub mod oracle;
pub mod registry;
pub mod resolve;
pub mod types;

pub use engine::{Activation, DependencyEngine, IoEvent, IoKind, SessionFlags};
pub use oracle::{RangeQuery, TaintOracle};
pub use registry::TargetRegistry;
pub use resolve::{EndpointResolver, TableResolver};
pub use types::{TargetSink, TargetSource};
