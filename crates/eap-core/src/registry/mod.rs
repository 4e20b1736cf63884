//! Process-wide view of worker instances.
//!
//! Provisioning and termination flows write to the registry; the capacity
//! reconciler only reads it through [`InstanceView`]. Iteration is weakly
//! consistent: a pass sees some state the map was in while it held the read lock.
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tokio::sync::Notify;
use tracing::trace;

use eap_model::{Instance, InstanceId, InstancePhase};

use crate::error::CoreError;

/// Read-only source of the pending-instance count.
pub trait InstanceView: Send + Sync {
    /// Number of instances currently in the [`InstancePhase::Pending`] phase.
    fn pending_count(&self) -> usize;
}

impl InstanceView for HashMap<InstanceId, Instance> {
    fn pending_count(&self) -> usize {
        self.values().filter(|i| i.is_pending()).count()
    }
}

impl InstanceView for [Instance] {
    fn pending_count(&self) -> usize {
        self.iter().filter(|i| i.is_pending()).count()
    }
}

impl InstanceView for Vec<Instance> {
    fn pending_count(&self) -> usize {
        self.as_slice().pending_count()
    }
}

/// Shared, cloneable instance map.
///
/// Clones share the same underlying map and change signal.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    instances: Arc<RwLock<HashMap<InstanceId, Instance>>>,
    changed: Arc<Notify>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal fired after any mutation that may change the pending count.
    ///
    /// Uses `notify_one`, so bursts of changes collapse into a single wake-up.
    pub fn change_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.changed)
    }

    /// Insert or replace an instance; returns the previous snapshot.
    pub fn upsert(&self, instance: Instance) -> Option<Instance> {
        trace!(instance = %instance.id, phase = %instance.phase, "registry upsert");
        let prev = self.write().insert(instance.id.clone(), instance);
        self.changed.notify_one();
        prev
    }

    /// Move an instance to `phase`; returns the previous phase if it was known.
    pub fn set_phase(&self, id: &str, phase: InstancePhase) -> Option<InstancePhase> {
        let prev = {
            let mut map = self.write();
            let inst = map.get_mut(id)?;
            std::mem::replace(&mut inst.phase, phase)
        };
        trace!(instance = id, from = %prev, to = %phase, "registry phase change");
        if prev != phase {
            self.changed.notify_one();
        }
        Some(prev)
    }

    pub fn remove(&self, id: &str) -> Option<Instance> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            trace!(instance = id, "registry remove");
            self.changed.notify_one();
        }
        removed
    }

    /// Replace the whole content with a fresh platform listing.
    ///
    /// Returns how many listed instances left the pending phase, i.e. were
    /// pending before and are listed in another phase now.
    pub fn replace_all<I>(&self, instances: I) -> usize
    where
        I: IntoIterator<Item = Instance>,
    {
        let fresh: HashMap<InstanceId, Instance> =
            instances.into_iter().map(|i| (i.id.clone(), i)).collect();
        let len = fresh.len();

        let started = {
            let mut map = self.write();
            let started = fresh
                .values()
                .filter(|i| !i.is_pending())
                .filter(|i| map.get(&i.id).is_some_and(Instance::is_pending))
                .count();
            *map = fresh;
            started
        };
        trace!(instances = len, started, "registry replaced");
        self.changed.notify_one();
        started
    }

    pub fn get(&self, id: &str) -> Option<Instance> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of all instances, in no particular order.
    pub fn snapshot(&self) -> Vec<Instance> {
        self.read().values().cloned().collect()
    }

    /// First instance labelled with the given job id.
    pub fn find_by_job_id(&self, job_id: u64) -> Option<Instance> {
        let wanted = job_id.to_string();
        self.read()
            .values()
            .find(|i| i.job_id() == Some(wanted.as_str()))
            .cloned()
    }

    /// Resolve the instance for a status lookup.
    ///
    /// A non-blank `agent_id` takes precedence; otherwise the job id label is used.
    pub fn locate(&self, agent_id: Option<&str>, job_id: Option<u64>) -> Result<Instance, CoreError> {
        match agent_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self
                .get(id)
                .ok_or_else(|| CoreError::NotFound(format!("no instance with agent id '{id}'"))),
            None => {
                let job_id = job_id.ok_or_else(|| {
                    CoreError::NotFound("neither agent id nor job id given".to_string())
                })?;
                self.find_by_job_id(job_id)
                    .ok_or_else(|| CoreError::NotFound(format!("no instance for job {job_id}")))
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<InstanceId, Instance>> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<InstanceId, Instance>> {
        self.instances.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InstanceView for InstanceRegistry {
    fn pending_count(&self) -> usize {
        self.read().pending_count()
    }
}
