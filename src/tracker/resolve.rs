//! Consumed contract for mapping I/O handles to endpoint identities.
//!
//! The host environment decodes syscalls and knows, per process, which
//! handle refers to which file or peer. The accounting engine only sees the
//! resolved identity string and compares it against the registry; an
//! unresolvable handle (closed descriptor, dead process, introspection
//! failure) resolves to `None` and is treated exactly like an identity that
//! matches nothing.

use rustc_hash::FxHashMap;

/// Resolves a process-scoped I/O handle to a canonical endpoint identity.
pub trait EndpointResolver {
    /// The identity string for `handle` in `process`, or `None` if the
    /// handle cannot be resolved. The returned string is compared against
    /// registered targets' display identities.
    fn resolve(&self, process: u64, handle: i64) -> Option<String>;
}

/// Table-backed resolver.
///
/// The glue a host embedding uses when it decodes handle lifecycles itself:
/// bind an identity on open, unbind on close, and hand the table to the
/// engine as its resolver.
#[derive(Debug, Default)]
pub struct TableResolver {
    bindings: FxHashMap<(u64, i64), String>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handle` in `process` to an identity. Rebinding replaces the
    /// previous identity, matching descriptor reuse semantics.
    pub fn bind(&mut self, process: u64, handle: i64, identity: impl Into<String>) {
        self.bindings.insert((process, handle), identity.into());
    }

    /// Drop the binding for `handle` in `process`, if any.
    pub fn unbind(&mut self, process: u64, handle: i64) {
        self.bindings.remove(&(process, handle));
    }
}

impl EndpointResolver for TableResolver {
    fn resolve(&self, process: u64, handle: i64) -> Option<String> {
        self.bindings.get(&(process, handle)).cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
