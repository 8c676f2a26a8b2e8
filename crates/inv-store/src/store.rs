//! Multi-tenant store root
//!
//! Routes every operation to a tenant-specific namespace, created on
//! first use. Requests without a tenant land in the reserved default
//! namespace.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use inv_common::{Error, Result};

use crate::migrations::{Version, SCHEMA_VERSION};
use crate::namespace::Namespace;
use crate::snapshot;

/// Name of the namespace backing requests without a tenant.
pub const DEFAULT_TENANT: &str = "default";

/// The multi-tenant device store.
pub struct TenantStore {
    namespaces: DashMap<String, Arc<Namespace>>,
    snapshot_path: Option<PathBuf>,
}

impl TenantStore {
    /// Ephemeral in-memory store.
    pub fn new() -> Self {
        TenantStore {
            namespaces: DashMap::new(),
            snapshot_path: None,
        }
    }

    /// Store backed by a JSON snapshot file. Prior state is loaded when
    /// the file exists; `flush` rewrites it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let namespaces = DashMap::new();
        for (name, state) in snapshot::load(&path)? {
            namespaces.insert(name, Arc::new(Namespace::from_state(state)));
        }
        Ok(TenantStore {
            namespaces,
            snapshot_path: Some(path),
        })
    }

    /// Resolve a tenant to its namespace, provisioning it on first use.
    /// `None` selects the default namespace.
    pub fn namespace(&self, tenant: Option<&str>) -> Arc<Namespace> {
        let key = tenant.unwrap_or(DEFAULT_TENANT);
        self.namespaces
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Namespace::new()))
            .clone()
    }

    /// Idempotently provision a tenant namespace and record the current
    /// schema version in its migration history. An empty id is rejected.
    pub fn create_tenant(&self, tenant_id: &str) -> Result<()> {
        if tenant_id.is_empty() {
            return Err(Error::invalid("tenant_id must not be empty"));
        }
        let created = !self.namespaces.contains_key(tenant_id);
        let ns = self.namespace(Some(tenant_id));
        ns.record_version(SCHEMA_VERSION);
        if created {
            info!(tenant_id, "tenant namespace provisioned");
        }
        Ok(())
    }

    /// Names of every provisioned namespace, default included, sorted.
    pub fn tenants(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Apply pending migrations to one tenant namespace (`None` selects
    /// the default). Safe to re-run; returns the versions applied.
    pub fn migrate(&self, tenant: Option<&str>) -> Result<Vec<Version>> {
        let name = tenant.unwrap_or(DEFAULT_TENANT);
        let applied = self.namespace(tenant).migrate();
        for version in &applied {
            info!(tenant = name, %version, "migration applied");
        }
        Ok(applied)
    }

    /// Apply pending migrations to the default namespace and every
    /// provisioned tenant.
    pub fn migrate_all(&self) -> Result<()> {
        self.migrate(None)?;
        for name in self.tenants() {
            if name != DEFAULT_TENANT {
                self.migrate(Some(&name))?;
            }
        }
        Ok(())
    }

    /// Write the snapshot file, when one is configured.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let states = self
            .namespaces
            .iter()
            .map(|e| (e.key().clone(), e.value().snapshot_state()))
            .collect();
        snapshot::save(path, &states)
    }
}

impl Default for TenantStore {
    fn default() -> Self {
        Self::new()
    }
}
