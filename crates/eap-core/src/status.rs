use serde::Serialize;

use crate::{
    permit::PermitSet,
    registry::{InstanceRegistry, InstanceView},
};

/// Point-in-time capacity summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityStatus {
    pub ceiling: usize,
    pub pending: usize,
    pub available: usize,
    pub instances: usize,
    pub closed: bool,
}

impl CapacityStatus {
    /// Read the registry and the permit set; the two reads are not atomic together.
    pub fn collect(registry: &InstanceRegistry, permits: &PermitSet) -> Self {
        Self {
            ceiling: permits.ceiling(),
            pending: registry.pending_count(),
            available: permits.available(),
            instances: registry.len(),
            closed: permits.is_closed(),
        }
    }

    /// Permits currently held by workers (or not yet returned by a pass).
    #[inline]
    pub fn in_use(&self) -> usize {
        self.ceiling.saturating_sub(self.available)
    }
}

#[cfg(test)]
mod tests {
    use eap_model::{Instance, InstancePhase};

    use super::*;

    #[test]
    fn collect_reads_registry_and_permits() {
        let registry = InstanceRegistry::new();
        registry.upsert(Instance::pending("a"));
        registry.upsert(Instance::pending("b").with_phase(InstancePhase::Running));
        let permits = PermitSet::with_available(4, 3);

        let status = CapacityStatus::collect(&registry, &permits);
        assert_eq!(
            status,
            CapacityStatus {
                ceiling: 4,
                pending: 1,
                available: 3,
                instances: 2,
                closed: false,
            }
        );
        assert_eq!(status.in_use(), 1);
    }

    #[test]
    fn serializes_camel_case() {
        let permits = PermitSet::new(2);
        permits.close();
        let status = CapacityStatus::collect(&InstanceRegistry::new(), &permits);

        let json = serde_json::to_value(status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ceiling": 2,
                "pending": 0,
                "available": 0,
                "instances": 0,
                "closed": true
            })
        );
    }
}
