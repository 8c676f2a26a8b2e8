//! One tenant's namespace: devices, groups and migration history

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use inv_common::{
    dedupe_submission, Attribute, Device, DeviceId, Error, GroupName, Result, Scope, MAX_TAGS,
};
use inv_search::{Filter, Pagination, SortSpec};

use crate::revision;

/// Tag update mode: merge into or replace the tags scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagUpdateMode {
    /// Merge submitted tags into the existing set (PATCH)
    Merge,
    /// Replace the entire tags scope (PUT)
    Replace,
}

/// Device listing query.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Attribute predicates, ANDed across distinct keys
    pub filters: Vec<Filter>,
    /// Optional sort attribute
    pub sort: Option<SortSpec>,
    /// When set, keep only devices with (true) or without (false) a group
    pub has_group: Option<bool>,
    /// When set, keep only members of this group
    pub group: Option<GroupName>,
    /// Page selection
    pub page: Pagination,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filters: Vec::new(),
            sort: None,
            has_group: None,
            group: None,
            page: Pagination::default(),
        }
    }
}

/// Serializable state of one namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceState {
    pub(crate) devices: BTreeMap<String, Device>,
    pub(crate) generation: u64,
    pub(crate) migration_info: Vec<crate::migrations::MigrationInfo>,
}

/// A tenant namespace. All mutations run under a single write lock, so a
/// group move or a tag compare-and-swap is one observable transition.
pub struct Namespace {
    state: RwLock<NamespaceState>,
}

impl Namespace {
    /// Fresh, empty namespace.
    pub fn new() -> Self {
        Namespace {
            state: RwLock::new(NamespaceState::default()),
        }
    }

    /// Namespace restored from snapshot state.
    pub(crate) fn from_state(state: NamespaceState) -> Self {
        Namespace {
            state: RwLock::new(state),
        }
    }

    /// Clone of the current state, for snapshots.
    pub(crate) fn snapshot_state(&self) -> NamespaceState {
        self.state.read().clone()
    }

    /// Provisioning insert: create the device, or merge attributes into an
    /// existing record with the same id.
    pub fn add_device(
        &self,
        id: &DeviceId,
        description: Option<String>,
        attrs: Vec<Attribute>,
    ) -> Result<()> {
        for attr in &attrs {
            attr.validate()?;
        }
        let mut state = self.state.write();
        let device = ensure_device(&mut state, id);
        if description.is_some() {
            device.description = description;
        }
        merge_attrs(device, attrs);
        debug!(device_id = %id, "device provisioned");
        Ok(())
    }

    /// Merge attributes into the device record keyed by (scope, name),
    /// creating the device when absent. Attributes not named in the
    /// submission are left untouched.
    pub fn upsert_attributes(&self, id: &DeviceId, attrs: Vec<Attribute>) -> Result<()> {
        for attr in &attrs {
            attr.validate()?;
        }
        let mut state = self.state.write();
        let device = ensure_device(&mut state, id);
        merge_attrs(device, attrs);
        Ok(())
    }

    /// Fetch a device by id.
    pub fn get_device(&self, id: &DeviceId) -> Result<Device> {
        self.state
            .read()
            .devices
            .get(id.as_str())
            .cloned()
            .ok_or(Error::DeviceNotFound)
    }

    /// Remove a device and its group membership.
    pub fn delete_device(&self, id: &DeviceId) -> Result<()> {
        match self.state.write().devices.remove(id.as_str()) {
            Some(_) => Ok(()),
            None => Err(Error::DeviceNotFound),
        }
    }

    /// Update the tags scope under optimistic concurrency. With `if_match`
    /// set, the stored revision must match or the call fails with
    /// `PreconditionFailed` and changes nothing. Every successful update
    /// stores and returns a fresh revision token.
    pub fn update_tags(
        &self,
        id: &DeviceId,
        tags: Vec<Attribute>,
        mode: TagUpdateMode,
        if_match: Option<&str>,
    ) -> Result<String> {
        let tags: Vec<Attribute> = tags
            .into_iter()
            .map(|mut t| {
                t.scope = Scope::Tags;
                t
            })
            .collect();
        for tag in &tags {
            tag.validate()?;
        }
        let tags = dedupe_submission(tags);

        let mut state = self.state.write();
        {
            let device = state
                .devices
                .get(id.as_str())
                .ok_or(Error::DeviceNotFound)?;
            if let Some(expected) = if_match {
                if expected != device.revision {
                    return Err(Error::PreconditionFailed);
                }
            }
        }

        state.generation += 1;
        let generation = state.generation;
        let device = state
            .devices
            .get_mut(id.as_str())
            .ok_or(Error::DeviceNotFound)?;

        match mode {
            TagUpdateMode::Replace => {
                device.attributes.clear_scope(Scope::Tags);
                for tag in tags.into_iter().take(MAX_TAGS) {
                    device.attributes.upsert(tag);
                }
            }
            TagUpdateMode::Merge => {
                for tag in tags {
                    device.attributes.upsert(tag);
                }
                device.attributes.truncate_scope(Scope::Tags, MAX_TAGS);
            }
        }

        device.revision = revision::revision(id, generation);
        device.updated_ts = Utc::now();
        debug!(device_id = %id, revision = %device.revision, "tags updated");
        Ok(device.revision.clone())
    }

    /// Move the device into `group`, leaving any prior group, as a single
    /// transition.
    pub fn assign_group(&self, id: &DeviceId, group: GroupName) -> Result<()> {
        let mut state = self.state.write();
        let device = state
            .devices
            .get_mut(id.as_str())
            .ok_or(Error::DeviceNotFound)?;
        device.group = Some(group);
        Ok(())
    }

    /// Clear the device's membership of exactly `group`. A device that
    /// does not exist, has no group, or is in a different group is the
    /// same not-found condition.
    pub fn unassign_group(&self, id: &DeviceId, group: &GroupName) -> Result<()> {
        let mut state = self.state.write();
        let device = state
            .devices
            .get_mut(id.as_str())
            .ok_or(Error::DeviceNotFound)?;
        if device.group.as_ref() != Some(group) {
            return Err(Error::DeviceNotFound);
        }
        device.group = None;
        Ok(())
    }

    /// Current group of a device.
    pub fn device_group(&self, id: &DeviceId) -> Result<Option<GroupName>> {
        self.state
            .read()
            .devices
            .get(id.as_str())
            .map(|d| d.group.clone())
            .ok_or(Error::DeviceNotFound)
    }

    /// Names of groups with at least one member, sorted. Groups exist
    /// only while non-empty.
    pub fn list_groups(&self) -> Vec<GroupName> {
        let state = self.state.read();
        let mut groups: Vec<GroupName> = state
            .devices
            .values()
            .filter_map(|d| d.group.clone())
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }

    /// Member ids of one group, paginated. An unknown or empty group
    /// yields an empty page.
    pub fn devices_by_group(
        &self,
        group: &GroupName,
        page: Pagination,
    ) -> (Vec<DeviceId>, usize) {
        let state = self.state.read();
        let ids: Vec<DeviceId> = state
            .devices
            .values()
            .filter(|d| d.group.as_ref() == Some(group))
            .map(|d| d.id.clone())
            .collect();
        let total = ids.len();
        (page.slice(&ids).to_vec(), total)
    }

    /// Filtered, sorted, paginated device listing. Returns the page and
    /// the total match count.
    pub fn list_devices(&self, query: &ListQuery) -> (Vec<Device>, usize) {
        let state = self.state.read();
        let mut matches: Vec<Device> = state
            .devices
            .values()
            .filter(|d| query.filters.iter().all(|f| f.matches(d)))
            .filter(|d| match query.has_group {
                Some(true) => d.group.is_some(),
                Some(false) => d.group.is_none(),
                None => true,
            })
            .filter(|d| match &query.group {
                Some(g) => d.group.as_ref() == Some(g),
                None => true,
            })
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            sort.sort(&mut matches);
        }

        let total = matches.len();
        let page = query.page.slice(&matches).to_vec();
        (page, total)
    }

    /// Applied-migration history.
    pub fn migration_info(&self) -> Vec<crate::migrations::MigrationInfo> {
        self.state.read().migration_info.clone()
    }

    /// Apply pending migrations; returns the versions applied.
    pub fn migrate(&self) -> Vec<crate::migrations::Version> {
        crate::migrations::apply_pending(&mut self.state.write())
    }

    /// Record the given schema version without running the chain, used
    /// when provisioning a namespace at the current version.
    pub(crate) fn record_version(&self, version: crate::migrations::Version) {
        let mut state = self.state.write();
        if state.migration_info.iter().any(|m| m.version == version) {
            return;
        }
        state.migration_info.push(crate::migrations::MigrationInfo {
            version,
            timestamp: Utc::now(),
        });
    }

    /// Number of devices in the namespace.
    pub fn device_count(&self) -> usize {
        self.state.read().devices.len()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_device<'a>(state: &'a mut NamespaceState, id: &DeviceId) -> &'a mut Device {
    if !state.devices.contains_key(id.as_str()) {
        state.generation += 1;
        let generation = state.generation;
        let now = Utc::now();
        state.devices.insert(
            id.as_str().to_string(),
            Device {
                id: id.clone(),
                description: None,
                attributes: Default::default(),
                group: None,
                revision: revision::revision(id, generation),
                created_ts: now,
                updated_ts: now,
            },
        );
    }
    state
        .devices
        .get_mut(id.as_str())
        .expect("device inserted above")
}

fn merge_attrs(device: &mut Device, attrs: Vec<Attribute>) {
    for attr in attrs {
        device.attributes.upsert(attr);
    }
    device.updated_ts = Utc::now();
}
