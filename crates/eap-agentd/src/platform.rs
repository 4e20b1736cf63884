//! In-process stand-in for the orchestration platform.
//!
//! Pods report `Pending` for a fixed start delay after creation and `Running`
//! afterwards. Nothing leaves the process.
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use eap_core::{Platform, PlatformError};
use eap_model::{CreateAgentRequest, Instance, InstancePhase, Labels};

struct Pod {
    labels: Labels,
    created_at: Instant,
}

pub struct SimulatedPlatform {
    pods: RwLock<HashMap<String, Pod>>,
    start_delay: Duration,
}

impl SimulatedPlatform {
    pub fn new(start_delay: Duration) -> Self {
        Self {
            pods: RwLock::new(HashMap::new()),
            start_delay,
        }
    }

    fn view(&self, id: &str, pod: &Pod, now: Instant) -> Instance {
        let phase = if now.duration_since(pod.created_at) >= self.start_delay {
            InstancePhase::Running
        } else {
            InstancePhase::Pending
        };
        Instance::pending(id)
            .with_phase(phase)
            .with_labels(pod.labels.clone())
    }
}

#[async_trait]
impl Platform for SimulatedPlatform {
    async fn create_instance(&self, request: &CreateAgentRequest) -> Result<Instance, PlatformError> {
        let id = format!("eap-agent-{}", Uuid::new_v4().simple());
        let pod = Pod {
            labels: request.to_labels(),
            created_at: Instant::now(),
        };
        let instance = self.view(&id, &pod, pod.created_at);

        self.pods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), pod);
        debug!(instance = %id, job_id = request.job_id, "simulated pod created");
        Ok(instance)
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, PlatformError> {
        let now = Instant::now();
        let pods = self.pods.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pods.iter().map(|(id, pod)| self.view(id, pod, now)).collect())
    }

    async fn delete_instance(&self, id: &str) -> Result<(), PlatformError> {
        self.pods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use eap_model::LABEL_JOB_ID;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pods_start_after_delay() {
        let platform = SimulatedPlatform::new(Duration::from_secs(2));
        let created = platform
            .create_instance(&CreateAgentRequest::new(41))
            .await
            .unwrap();

        assert!(created.is_pending());
        assert!(created.id.starts_with("eap-agent-"));
        assert_eq!(created.labels.get(LABEL_JOB_ID), Some("41"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(platform.list_instances().await.unwrap()[0].is_pending());

        tokio::time::advance(Duration::from_secs(1)).await;
        let listed = platform.list_instances().await.unwrap();
        assert_eq!(listed[0].phase, InstancePhase::Running);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn delete_unknown_pod_is_not_found() {
        let platform = SimulatedPlatform::new(Duration::ZERO);
        let created = platform
            .create_instance(&CreateAgentRequest::new(1))
            .await
            .unwrap();
        assert_eq!(created.phase, InstancePhase::Running);

        platform.delete_instance(&created.id).await.unwrap();
        assert!(matches!(
            platform.delete_instance(&created.id).await,
            Err(PlatformError::NotFound(_))
        ));
        assert!(platform.list_instances().await.unwrap().is_empty());
    }
}
