//! Domain primitive types used across the bakery workspace.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Name of a machine-image build target (e.g. `mesos-leader`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuilderName(String);

impl BuilderName {
    /// Creates a builder name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuilderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BuilderName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// The per-invocation build timestamp substituted for the `{{timestamp}}`
/// and `{{isotime}}` tokens.
///
/// The numeric component is strictly monotonic within a process, so two
/// successive resolutions never generate the same image name even when they
/// fall inside the same wall-clock second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStamp {
    /// Monotonic nanosecond counter used for `{{timestamp}}`.
    pub serial: i64,
    /// RFC 3339 wall-clock time used for `{{isotime}}`.
    pub isotime: String,
}

impl BuildStamp {
    /// Captures a new build stamp from the current wall clock.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();
        let nanos = now.timestamp_nanos_opt().unwrap_or(i64::MAX);
        // Guard against clock resolution: never reuse or go backwards.
        let serial = LAST_STAMP
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(nanos.max(last + 1))
            })
            .map_or(nanos, |last| nanos.max(last + 1));
        Self {
            serial,
            isotime: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Builds a stamp from explicit parts, for deterministic tests.
    #[must_use]
    pub fn from_parts(serial: i64, isotime: impl Into<String>) -> Self {
        Self {
            serial,
            isotime: isotime.into(),
        }
    }

    /// Returns the `{{timestamp}}` substitution value.
    #[must_use]
    pub fn timestamp(&self) -> String {
        self.serial.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_name_displays_inner_value() {
        let name = BuilderName::new("mesos-leader");
        assert_eq!(name.to_string(), "mesos-leader");
        assert_eq!(name.as_str(), "mesos-leader");
    }

    #[test]
    fn build_stamps_are_strictly_increasing() {
        let a = BuildStamp::now();
        let b = BuildStamp::now();
        assert!(b.serial > a.serial, "{} !> {}", b.serial, a.serial);
    }

    #[test]
    fn build_stamp_from_parts_is_deterministic() {
        let stamp = BuildStamp::from_parts(42, "2015-03-01T00:00:00Z");
        assert_eq!(stamp.timestamp(), "42");
        assert_eq!(stamp.isotime, "2015-03-01T00:00:00Z");
    }
}
