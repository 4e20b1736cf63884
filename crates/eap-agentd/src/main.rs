mod config;
mod platform;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use eap_core::{
    CapacityService, CoreError, InstanceRegistry, MetricsHandle, PermitError, Platform,
    Provisioner, refresh_controller,
};
use eap_model::CreateAgentRequest;
use eap_observe::{EventLogger, init_logger};
use eap_prometheus::PrometheusMetrics;
use taskvisor::{ControllerConfig, Subscribe, SupervisorConfig};

use crate::{
    config::{AgentdConfig, DemoConfig},
    platform::SimulatedPlatform,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config + logger
    let cfg = AgentdConfig::load()?;
    init_logger(&cfg.logger)?;
    info!(
        ceiling = cfg.capacity.max_pending_instances,
        interval_ms = cfg.capacity.reconcile_interval_ms,
        "config loaded"
    );

    // 2) shared state
    let registry = InstanceRegistry::new();
    let prometheus = PrometheusMetrics::new()?;
    let metrics: MetricsHandle = Arc::new(prometheus.clone());
    let platform: Arc<dyn Platform> = Arc::new(SimulatedPlatform::new(cfg.demo.start_delay()));

    // 3) capacity service (supervisor + reconcile loop)
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(EventLogger)];
    let service = CapacityService::start(
        &cfg.capacity,
        registry.clone(),
        SupervisorConfig::default(),
        ControllerConfig::default(),
        subscribers,
        Arc::clone(&metrics),
    )
    .await?;

    // 4) provisioner + periodic refresh from the platform
    let provisioner = Arc::new(
        Provisioner::new(platform, registry, service.permits())
            .with_acquire_timeout(cfg.capacity.acquire_timeout())
            .with_metrics(metrics),
    );
    service
        .submit(refresh_controller(
            Arc::clone(&provisioner),
            cfg.capacity.refresh_interval(),
            service.stop_token(),
            &cfg.capacity.restart_backoff,
        ))
        .await?;

    // 5) demo workload
    let shutdown = service.stop_token();
    let mut workers = spawn_workers(&cfg.demo, &provisioner, &shutdown);
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
        _ = async { while workers.join_next().await.is_some() {} } => {
            info!("all demo jobs handled");
        }
    }

    // 6) shutdown: running agents are terminated before the final status
    service.stop().await;
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            warn!(reason = %e, "demo worker failed");
        }
    }

    let status = service.status();
    info!(
        ceiling = status.ceiling,
        pending = status.pending,
        available = status.available,
        instances = status.instances,
        "final capacity status"
    );
    let rendered = prometheus.render()?;
    debug!(metrics = %rendered, "final metrics");
    Ok(())
}

/// Each worker owns the finish jobs of the agents it started and waits for
/// them before returning.
fn spawn_workers(
    demo: &DemoConfig,
    provisioner: &Arc<Provisioner>,
    shutdown: &CancellationToken,
) -> JoinSet<()> {
    let next_job = Arc::new(AtomicU64::new(1));
    let mut set = JoinSet::new();

    for worker in 0..demo.workers {
        let provisioner = Arc::clone(provisioner);
        let next_job = Arc::clone(&next_job);
        let last_job = demo.jobs;
        let job_duration = demo.job_duration();
        let shutdown = shutdown.clone();

        set.spawn(async move {
            let mut running = JoinSet::new();
            loop {
                let job_id = next_job.fetch_add(1, Ordering::SeqCst);
                if job_id > last_job {
                    break;
                }
                match provisioner.create_agent(&CreateAgentRequest::new(job_id)).await {
                    Ok(instance) => {
                        running.spawn(finish_job(
                            Arc::clone(&provisioner),
                            instance.id,
                            job_duration,
                            shutdown.clone(),
                        ));
                    }
                    Err(CoreError::Permit(PermitError::Closed)) => break,
                    Err(e) => warn!(worker, job_id, reason = %e, "job skipped"),
                }
            }
            while running.join_next().await.is_some() {}
        });
    }
    set
}

/// Terminate `instance` after `after`, or at once on shutdown.
async fn finish_job(
    provisioner: Arc<Provisioner>,
    instance: String,
    after: Duration,
    shutdown: CancellationToken,
) {
    tokio::select! {
        _ = tokio::time::sleep(after) => {}
        _ = shutdown.cancelled() => debug!(%instance, "terminating agent on shutdown"),
    }
    if let Err(e) = provisioner.terminate(&instance).await {
        warn!(%instance, reason = %e, "failed to terminate agent");
    }
}

#[cfg(test)]
mod tests {
    use eap_core::PermitSet;
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn shutdown_terminates_running_agents() {
        let demo = DemoConfig {
            jobs: 3,
            workers: 2,
            start_delay_ms: 0,
            job_duration_ms: 3_600_000,
        };
        let platform = Arc::new(SimulatedPlatform::new(demo.start_delay()));
        let registry = InstanceRegistry::new();
        let permits = Arc::new(PermitSet::with_available(5, 5));
        let provisioner = Arc::new(Provisioner::new(
            platform.clone(),
            registry.clone(),
            Arc::clone(&permits),
        ));
        let shutdown = CancellationToken::new();
        let started = Instant::now();

        let mut workers = spawn_workers(&demo, &provisioner, &shutdown);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registry.len(), 3);

        shutdown.cancel();
        permits.close();
        while let Some(res) = workers.join_next().await {
            res.unwrap();
        }

        assert!(started.elapsed() < demo.job_duration(), "agents were not left to run out");
        assert!(registry.is_empty());
        assert!(platform.list_instances().await.unwrap().is_empty());
    }
}
