//! Directory of live groups.

use super::ObservableGroup;
use crate::error::{GroupError, Result};
use crate::types::{GroupConfig, GroupId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Creates groups and indexes them by id.
///
/// There is no global instance: create one at startup and pass it to whatever
/// creates groups.
pub struct ObservableManager {
    /// Live groups by ID.
    groups: RwLock<HashMap<GroupId, Arc<ObservableGroup>>>,
    /// Counter for generating group IDs.
    next_id: AtomicU64,
}

impl ObservableManager {
    /// Create a manager with no groups.
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create and track a new unlocked group.
    pub fn new_group(&self) -> Arc<ObservableGroup> {
        self.new_group_with(GroupConfig::default())
    }

    /// Create and track a new group with `config`.
    pub fn new_group_with(&self, config: GroupConfig) -> Arc<ObservableGroup> {
        let id = GroupId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let group = Arc::new(ObservableGroup::new(id, config));

        self.groups.write().insert(id, Arc::clone(&group));
        debug!(group = %id, label = ?group.label(), "created group");
        group
    }

    /// Look up a live group, e.g. after the owning scope was recreated.
    ///
    /// Groups destroyed directly through [`ObservableGroup::destroy`] are
    /// forgotten here too.
    pub fn get_group(&self, id: GroupId) -> Result<Arc<ObservableGroup>> {
        let group = self
            .groups
            .read()
            .get(&id)
            .cloned()
            .ok_or(GroupError::GroupNotFound(id))?;

        if group.is_destroyed() {
            self.groups.write().remove(&id);
            return Err(GroupError::GroupNotFound(id));
        }
        Ok(group)
    }

    /// Destroy `group` and stop tracking it. No-op if it is already gone.
    pub fn destroy(&self, group: &ObservableGroup) {
        group.destroy();
        if self.groups.write().remove(&group.id()).is_some() {
            debug!(group = %group.id(), "removed group");
        }
    }

    /// Number of tracked groups.
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }
}

impl Default for ObservableManager {
    fn default() -> Self {
        Self::new()
    }
}
