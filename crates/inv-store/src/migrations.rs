//! Schema versioning and per-namespace migrations
//!
//! Every namespace records the migrations applied to it in its
//! `migration_info` history. The known chain normalizes legacy state:
//! `0.2.0` rebuilds attribute bags (scope backfill and (scope, name)
//! dedup), `1.0.0` enforces the tags-scope invariants (dedup plus the
//! live-tag cap).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inv_common::{Error, Result, Scope, MAX_TAGS};

use crate::namespace::NamespaceState;

/// Schema version, ordered by (major, minor, patch).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

/// The schema version this build of the service writes.
pub const SCHEMA_VERSION: Version = Version::new(1, 0, 0);

impl Version {
    /// Build a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `major.minor.patch` string.
    pub fn parse(s: &str) -> Result<Version> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::invalid(format!("invalid version '{}'", s)));
        }
        let component = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| Error::invalid(format!("invalid version '{}'", s)))
        };
        Ok(Version {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: component(parts[2])?,
        })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Record of one applied migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationInfo {
    /// Version the namespace was migrated to
    pub version: Version,
    /// When the migration was applied
    pub timestamp: DateTime<Utc>,
}

type MigrationFn = fn(&mut NamespaceState);

// Ascending chain of known migrations.
const MIGRATIONS: &[(Version, MigrationFn)] = &[
    (Version::new(0, 2, 0), migrate_0_2_0),
    (Version::new(1, 0, 0), migrate_1_0_0),
];

/// Apply every migration newer than the namespace's latest record, in
/// order. Returns the versions applied by this call; re-running with
/// nothing pending is a no-op.
pub fn apply_pending(state: &mut NamespaceState) -> Vec<Version> {
    let latest = state
        .migration_info
        .iter()
        .map(|m| m.version)
        .max()
        .unwrap_or(Version::new(0, 0, 0));

    let mut applied = Vec::new();
    for (version, run) in MIGRATIONS {
        if *version <= latest {
            continue;
        }
        run(state);
        state.migration_info.push(MigrationInfo {
            version: *version,
            timestamp: Utc::now(),
        });
        applied.push(*version);
    }
    applied
}

// Rebuild every attribute bag through the deduplicating collector; legacy
// records could carry duplicate (scope, name) entries.
fn migrate_0_2_0(state: &mut NamespaceState) {
    for device in state.devices.values_mut() {
        device.attributes = device.attributes.iter().cloned().collect();
    }
}

// Enforce the tags-scope cap on stored records.
fn migrate_1_0_0(state: &mut NamespaceState) {
    for device in state.devices.values_mut() {
        device.attributes.truncate_scope(Scope::Tags, MAX_TAGS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!(Version::parse("1.0.2").unwrap(), Version::new(1, 0, 2));
        assert!(Version::parse("1.0").is_err());
        assert!(Version::parse("1.0.x").is_err());
        assert!(Version::new(0, 2, 0) < Version::new(1, 0, 0));
        assert!(Version::new(1, 0, 1) > Version::new(1, 0, 0));
        assert_eq!(Version::new(1, 0, 0).to_string(), "1.0.0");
    }

    #[test]
    fn test_apply_pending_is_idempotent() {
        let mut state = NamespaceState::default();

        let applied = apply_pending(&mut state);
        assert_eq!(
            applied,
            vec![Version::new(0, 2, 0), Version::new(1, 0, 0)]
        );
        assert_eq!(state.migration_info.len(), 2);

        let applied = apply_pending(&mut state);
        assert!(applied.is_empty());
        assert_eq!(state.migration_info.len(), 2);
    }

    #[test]
    fn test_apply_pending_respects_prior_records() {
        let mut state = NamespaceState::default();
        state.migration_info.push(MigrationInfo {
            version: SCHEMA_VERSION,
            timestamp: Utc::now(),
        });

        assert!(apply_pending(&mut state).is_empty());
        assert_eq!(state.migration_info.len(), 1);
    }
}
