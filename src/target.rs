//! Endpoint identity model.
//!
//! A [`Target`] names one I/O endpoint a session cares about: a file path or
//! a network peer. Targets serve double duty as configuration (what to track)
//! and as the comparison key matched against identities resolved from live
//! I/O handles, so the display string and the equality relation are the
//! contract here:
//!
//! - `File` displays as its path, `Network` as `ip::port`.
//! - Equality is total and variant-exhaustive: two targets are equal only
//!   when they are the same variant with identical identity fields;
//!   cross-variant comparisons are always false.
//! - A default-constructed target of either variant (empty path / empty ip)
//!   is the invalid sentinel used when no endpoint is configured.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DepflowError;

/// A trackable I/O endpoint.
///
/// The closed variant set keeps display, validity and equality exhaustive at
/// compile time; adding a variant forces every match below to be revisited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A file endpoint, identified by its path.
    File { path: String },
    /// A network endpoint, identified by peer address and port.
    Network { ip: String, port: u16 },
}

impl Target {
    /// Create a file target.
    #[inline]
    pub fn file(path: impl Into<String>) -> Self {
        Target::File { path: path.into() }
    }

    /// Create a network target.
    #[inline]
    pub fn network(ip: impl Into<String>, port: u16) -> Self {
        Target::Network {
            ip: ip.into(),
            port,
        }
    }

    /// The invalid network sentinel (empty ip, port 0).
    ///
    /// The invalid file sentinel is [`Target::default`].
    #[inline]
    pub fn default_network() -> Self {
        Target::Network {
            ip: String::new(),
            port: 0,
        }
    }

    /// Whether this target is valid.
    ///
    /// A file target is valid iff its path is non-empty; a network target
    /// iff its ip is non-empty. Invalid targets are rejected at
    /// registration, so everything inside a frozen registry is valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        match self {
            Target::File { path } => !path.is_empty(),
            Target::Network { ip, .. } => !ip.is_empty(),
        }
    }

    /// Short variant name for log lines and error messages.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Target::File { .. } => "file",
            Target::Network { .. } => "network",
        }
    }
}

impl Default for Target {
    /// The invalid file sentinel.
    fn default() -> Self {
        Target::File {
            path: String::new(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::File { path } => write!(f, "{}", path),
            Target::Network { ip, port } => write!(f, "{}::{}", ip, port),
        }
    }
}

impl FromStr for Target {
    type Err = DepflowError;

    /// Parse an endpoint descriptor.
    ///
    /// A descriptor whose final `::`-separated segment parses as a port is a
    /// network target (`10.0.0.2::8080`); anything else is a file path.
    /// The syntax mirrors [`Target`]'s display format, so descriptors and
    /// report identities round-trip.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DepflowError::InvalidTarget(
                "empty endpoint descriptor".to_string(),
            ));
        }
        if let Some((ip, port)) = s.rsplit_once("::") {
            if let Ok(port) = port.parse::<u16>() {
                if ip.is_empty() {
                    return Err(DepflowError::InvalidTarget(s.to_string()));
                }
                return Ok(Target::network(ip, port));
            }
        }
        Ok(Target::file(s))
    }
}

// =============================================================================
// Tests
// =============================================================================
