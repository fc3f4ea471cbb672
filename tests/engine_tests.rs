//! End-to-end accounting scenarios.
//!
//! Drives a full engine through setup, events and teardown using a
//! byte-granular shadow-memory oracle. Taint propagation itself is the real
//! oracle's job, so the tests move shadow state explicitly to simulate the
//! monitored program copying data between buffers.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use depflow::{
    DependencyEngine, DepflowError, IoEvent, RangeQuery, SessionConfig, TableResolver,
    TaintOracle, Target,
};

// =============================================================================
// Shadow-Memory Oracle
// =============================================================================

type Shadow = Rc<RefCell<BTreeMap<(u64, u64), BTreeSet<u32>>>>;

/// Byte-granular shadow map: (process, address) -> set of labels.
#[derive(Default)]
struct ShadowOracle {
    enabled: bool,
    shadow: Shadow,
}

impl ShadowOracle {
    fn new() -> (Self, Shadow) {
        let shadow: Shadow = Rc::default();
        (
            Self {
                enabled: false,
                shadow: Rc::clone(&shadow),
            },
            shadow,
        )
    }
}

/// Simulate the monitored program copying `len` bytes between buffers.
fn propagate(shadow: &Shadow, process: u64, from: u64, to: u64, len: u32) {
    let mut map = shadow.borrow_mut();
    for i in 0..u64::from(len) {
        let labels = map.get(&(process, from + i)).cloned();
        match labels {
            Some(labels) if !labels.is_empty() => {
                map.insert((process, to + i), labels);
            }
            _ => {
                map.remove(&(process, to + i));
            }
        }
    }
}

impl TaintOracle for ShadowOracle {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn label_range(&mut self, process: u64, addr: u64, len: u32, label: u32) -> u32 {
        if !self.enabled {
            return 0;
        }
        let mut map = self.shadow.borrow_mut();
        for i in 0..u64::from(len) {
            map.entry((process, addr + i)).or_default().insert(label);
        }
        len
    }

    fn query_range(&self, process: u64, addr: u64, len: u32) -> RangeQuery {
        if !self.enabled {
            return RangeQuery::empty();
        }
        let map = self.shadow.borrow();
        let mut per_label: BTreeMap<u32, u32> = BTreeMap::new();
        let mut tainted_bytes = 0;
        for i in 0..u64::from(len) {
            if let Some(labels) = map.get(&(process, addr + i)) {
                if labels.is_empty() {
                    continue;
                }
                tainted_bytes += 1;
                for &label in labels {
                    *per_label.entry(label).or_insert(0) += 1;
                }
            }
        }
        RangeQuery {
            per_label,
            tainted_bytes,
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

const PROC: u64 = 7;
const IN_FD: i64 = 3;
const OUT_FD: i64 = 4;

/// Route the engine's tracing output through the test writer so matched
/// events and activation transitions show up with `--nocapture`. Idempotent
/// across tests sharing one process.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn file_session(
    threshold: u64,
) -> (DependencyEngine<ShadowOracle, TableResolver>, Shadow) {
    init_tracing();
    let config = SessionConfig::new()
        .source(Target::file("/tmp/in"))
        .sink(Target::file("/tmp/out"))
        .activate_at(threshold);
    let mut resolver = TableResolver::new();
    resolver.bind(PROC, IN_FD, "/tmp/in");
    resolver.bind(PROC, OUT_FD, "/tmp/out");
    let (oracle, shadow) = ShadowOracle::new();
    let engine = DependencyEngine::new(config, oracle, resolver).unwrap();
    (engine, shadow)
}

// =============================================================================
// Scenario A: full attribution with threshold 0
// =============================================================================

#[test]
fn test_scenario_full_attribution() {
    let (mut engine, shadow) = file_session(0);
    assert!(engine.is_active());

    engine.handle_event(IoEvent::open(PROC, IN_FD));
    engine.handle_event(IoEvent::read(PROC, IN_FD, 0x1000, 100));
    propagate(&shadow, PROC, 0x1000, 0x2000, 100);
    engine.handle_event(IoEvent::write(PROC, OUT_FD, 0x2000, 100));

    let report = engine.finish();
    assert_eq!(report.sources[0].total_bytes, 100);
    assert_eq!(report.sources[0].total_reads, 1);
    assert_eq!(report.sources[0].labeled_bytes, 100);

    assert_eq!(report.sinks[0].total_bytes, 100);
    assert_eq!(report.sinks[0].total_writes, 1);
    assert_eq!(report.sinks[0].total_taint_bytes, 100);
    assert_eq!(report.dependency(0, 0), 100);

    assert!(report.flags.saw_open_of_source);
    assert!(report.flags.saw_read_of_source);
    assert!(report.flags.saw_write_of_sink);
    assert!(report.activated);
}

// =============================================================================
// Scenario B: threshold never reached
// =============================================================================

#[test]
fn test_scenario_threshold_never_reached() {
    let (mut engine, shadow) = file_session(u64::MAX);

    engine.observe_translation(1_000_000_000);
    assert!(!engine.is_active());

    engine.handle_event(IoEvent::read(PROC, IN_FD, 0x1000, 100));
    propagate(&shadow, PROC, 0x1000, 0x2000, 100);
    engine.handle_event(IoEvent::write(PROC, OUT_FD, 0x2000, 100));

    let report = engine.finish();
    // Plain counters still move.
    assert_eq!(report.sources[0].total_bytes, 100);
    assert_eq!(report.sinks[0].total_bytes, 100);
    assert_eq!(report.sinks[0].total_writes, 1);
    // Taint-related fields stay at zero.
    assert_eq!(report.sources[0].labeled_bytes, 0);
    assert!(report.sinks[0].labeled_bytes.is_empty());
    assert_eq!(report.sinks[0].total_taint_bytes, 0);
    assert!(!report.activated);
}

// =============================================================================
// Scenario C: unmatched identity is a global no-op
// =============================================================================

#[test]
fn test_scenario_unmatched_identity_changes_nothing() {
    let (mut engine, _shadow) = file_session(0);

    // A handle bound to an identity absent from both registries.
    let mut resolver = TableResolver::new();
    resolver.bind(PROC, 9, "/var/log/noise");
    // Rebuild an engine sharing the same config but with the noisy binding.
    let config = SessionConfig::new()
        .source(Target::file("/tmp/in"))
        .sink(Target::file("/tmp/out"));
    let (oracle, _) = ShadowOracle::new();
    let mut noisy = DependencyEngine::new(config, oracle, resolver).unwrap();

    noisy.handle_event(IoEvent::open(PROC, 9));
    noisy.handle_event(IoEvent::read(PROC, 9, 0x1000, 64));
    noisy.handle_event(IoEvent::write(PROC, 9, 0x2000, 64));

    let report = noisy.finish();
    assert_eq!(report.sources[0].total_bytes, 0);
    assert_eq!(report.sources[0].total_reads, 0);
    assert_eq!(report.sinks[0].total_bytes, 0);
    assert_eq!(report.sinks[0].total_writes, 0);
    assert!(!report.flags.saw_open_of_source);
    assert!(!report.flags.saw_read_of_source);
    assert!(!report.flags.saw_write_of_sink);

    // Original engine untouched as well.
    let untouched = engine.finish();
    assert_eq!(untouched.sources[0].total_reads, 0);
}

// =============================================================================
// Scenario D: split attribution across two sources
// =============================================================================

#[test]
fn test_scenario_split_attribution() {
    init_tracing();
    let config = SessionConfig::new()
        .source(Target::file("/a"))
        .source(Target::file("/b"))
        .sink(Target::file("/out"));
    let mut resolver = TableResolver::new();
    resolver.bind(PROC, 3, "/a");
    resolver.bind(PROC, 4, "/b");
    resolver.bind(PROC, 5, "/out");
    let (oracle, shadow) = ShadowOracle::new();
    let mut engine = DependencyEngine::new(config, oracle, resolver).unwrap();

    engine.handle_event(IoEvent::read(PROC, 3, 0x1000, 50));
    engine.handle_event(IoEvent::read(PROC, 4, 0x3000, 50));
    // The program assembles the output buffer from both inputs.
    propagate(&shadow, PROC, 0x1000, 0x2000, 50);
    propagate(&shadow, PROC, 0x3000, 0x2032, 50);
    engine.handle_event(IoEvent::write(PROC, 5, 0x2000, 100));

    let report = engine.finish();
    assert_eq!(report.dependency(0, 0), 50);
    assert_eq!(report.dependency(0, 1), 50);
    assert_eq!(report.sinks[0].total_taint_bytes, 100);
    assert_eq!(report.sinks[0].total_bytes, 100);
}

// =============================================================================
// Multi-label bytes: each physical byte counted once
// =============================================================================

#[test]
fn test_multilabel_bytes_counted_once_in_taint_total() {
    init_tracing();
    let config = SessionConfig::new()
        .source(Target::file("/a"))
        .source(Target::file("/b"))
        .sink(Target::file("/out"));
    let mut resolver = TableResolver::new();
    resolver.bind(PROC, 3, "/a");
    resolver.bind(PROC, 4, "/b");
    resolver.bind(PROC, 5, "/out");
    let (oracle, shadow) = ShadowOracle::new();
    let mut engine = DependencyEngine::new(config, oracle, resolver).unwrap();

    // Both reads land in the same buffer: every byte carries both labels.
    engine.handle_event(IoEvent::read(PROC, 3, 0x1000, 40));
    engine.handle_event(IoEvent::read(PROC, 4, 0x1000, 40));
    propagate(&shadow, PROC, 0x1000, 0x2000, 40);
    engine.handle_event(IoEvent::write(PROC, 5, 0x2000, 40));

    let report = engine.finish();
    // Every contributing source gets full credit...
    assert_eq!(report.dependency(0, 0), 40);
    assert_eq!(report.dependency(0, 1), 40);
    // ...but the physical taint total counts each byte once.
    assert_eq!(report.sinks[0].total_taint_bytes, 40);
}

// =============================================================================
// Monotonicity and invariants over longer streams
// =============================================================================

#[test]
fn test_counters_monotonic_over_stream() {
    let (mut engine, shadow) = file_session(0);

    let mut last_total = 0;
    let mut last_labeled = 0;
    for round in 0..20u64 {
        let addr = 0x1000 + round * 0x100;
        engine.handle_event(IoEvent::read(PROC, IN_FD, addr, 32));
        propagate(&shadow, PROC, addr, 0x2000, 32);
        engine.handle_event(IoEvent::write(PROC, OUT_FD, 0x2000, 32));

        let source = engine.registry().source(0).unwrap();
        assert!(source.total_bytes() >= last_total);
        assert!(source.labeled_bytes() >= last_labeled);
        assert!(source.labeled_bytes() <= source.total_bytes());
        last_total = source.total_bytes();
        last_labeled = source.labeled_bytes();

        let sink = engine.registry().sink(0).unwrap();
        assert!(sink.total_taint_bytes() <= sink.total_bytes());
    }

    let report = engine.finish();
    assert_eq!(report.sources[0].total_reads, 20);
    assert_eq!(report.sinks[0].total_writes, 20);
    assert_eq!(report.sources[0].total_bytes, 640);
}

// =============================================================================
// Activation mid-session
// =============================================================================

#[test]
fn test_activation_mid_session_splits_accounting() {
    let (mut engine, shadow) = file_session(1_000);

    // Before the threshold: bytes counted, nothing labeled.
    engine.handle_event(IoEvent::read(PROC, IN_FD, 0x1000, 50));
    assert_eq!(engine.registry().source(0).unwrap().labeled_bytes(), 0);

    engine.observe_translation(2_000);
    assert!(engine.is_active());

    engine.handle_event(IoEvent::read(PROC, IN_FD, 0x1100, 50));
    propagate(&shadow, PROC, 0x1100, 0x2000, 50);
    engine.handle_event(IoEvent::write(PROC, OUT_FD, 0x2000, 50));

    let report = engine.finish();
    assert_eq!(report.sources[0].total_bytes, 100);
    assert_eq!(report.sources[0].labeled_bytes, 50);
    assert_eq!(report.dependency(0, 0), 50);
    assert!(report.activated);
}

// =============================================================================
// Multi-process union semantics
// =============================================================================

#[test]
fn test_counts_are_unions_across_processes() {
    init_tracing();
    let config = SessionConfig::new()
        .source(Target::file("/tmp/in"))
        .sink(Target::file("/tmp/out"));
    let mut resolver = TableResolver::new();
    resolver.bind(1, 3, "/tmp/in");
    resolver.bind(2, 8, "/tmp/in");
    let (oracle, _) = ShadowOracle::new();
    let mut engine = DependencyEngine::new(config, oracle, resolver).unwrap();

    engine.handle_event(IoEvent::read(1, 3, 0x1000, 30));
    engine.handle_event(IoEvent::read(2, 8, 0x1000, 70));

    let report = engine.finish();
    // One session-wide row, not per-process partitions.
    assert_eq!(report.sources[0].total_bytes, 100);
    assert_eq!(report.sources[0].total_reads, 2);
}

// =============================================================================
// Configuration errors abort before the session starts
// =============================================================================

#[test]
fn test_bad_config_rejected_at_construction() {
    init_tracing();
    let (oracle, _) = ShadowOracle::new();
    let result = DependencyEngine::new(SessionConfig::new(), oracle, TableResolver::new());
    assert!(matches!(result, Err(DepflowError::Config(_))));

    let (oracle, _) = ShadowOracle::new();
    let config = SessionConfig::new()
        .source(Target::file("/a"))
        .source(Target::file("/a"))
        .sink(Target::file("/out"));
    let result = DependencyEngine::new(config, oracle, TableResolver::new());
    assert!(matches!(
        result,
        Err(DepflowError::DuplicateTarget { side: "source", .. })
    ));

    let (oracle, _) = ShadowOracle::new();
    let config = SessionConfig::new().source(Target::default()).sink(Target::file("/out"));
    let result = DependencyEngine::new(config, oracle, TableResolver::new());
    assert!(matches!(result, Err(DepflowError::InvalidTarget(_))));
}

// =============================================================================
// Network endpoints
// =============================================================================

#[test]
fn test_network_sink_attribution() {
    init_tracing();
    let config = SessionConfig::new()
        .source(Target::file("/etc/secrets"))
        .sink(Target::network("203.0.113.9", 4444));
    let mut resolver = TableResolver::new();
    resolver.bind(PROC, 3, "/etc/secrets");
    resolver.bind(PROC, 6, "203.0.113.9::4444");
    let (oracle, shadow) = ShadowOracle::new();
    let mut engine = DependencyEngine::new(config, oracle, resolver).unwrap();

    engine.handle_event(IoEvent::read(PROC, 3, 0x5000, 256));
    propagate(&shadow, PROC, 0x5000, 0x6000, 128);
    engine.handle_event(IoEvent::write(PROC, 6, 0x6000, 128));

    let report = engine.finish();
    assert_eq!(report.sinks[0].target, Target::network("203.0.113.9", 4444));
    assert_eq!(report.dependency(0, 0), 128);
    assert_eq!(report.sinks[0].total_taint_bytes, 128);
}
