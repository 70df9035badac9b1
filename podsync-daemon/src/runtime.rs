//! Runtime composition: supervisor + RPC server + signal handling.
//!
//! This is the embedding point for the (external) CLI/orchestrator: build a
//! [`RuntimeConfig`], hand over a [`SpecRegistry`] clone, and call
//! [`start_blocking`]. The orchestrator keeps its own registry clone to add
//! and remove specs while the runtime serves queries.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use podsync_core::SpecRegistry;

use crate::error::{io_err, DaemonError};
use crate::paths::DEFAULT_LIVENESS_TIMEOUT;
use crate::server::{serve, LivenessProbe};
use crate::supervisor::{DaemonSupervisor, SupervisorConfig};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub supervisor: SupervisorConfig,
    /// Port the RPC server binds on localhost.
    pub rpc_port: u16,
    /// Bound on `await_alive` before it reports a liveness timeout.
    pub liveness_timeout: Duration,
}

impl RuntimeConfig {
    pub fn new(supervisor: SupervisorConfig, rpc_port: u16) -> Self {
        Self {
            supervisor,
            rpc_port,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
        }
    }
}

/// Start the runtime and block the current thread until it exits.
pub fn start_blocking(config: RuntimeConfig, registry: SpecRegistry) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, registry))
}

/// Run the daemon supervisor and RPC server until ctrl-c.
pub async fn run(config: RuntimeConfig, registry: SpecRegistry) -> Result<(), DaemonError> {
    let mut supervisor = DaemonSupervisor::new(config.supervisor);
    supervisor.run().await?;

    let probe = LivenessProbe::new(supervisor.endpoint_handle(), config.liveness_timeout);
    let listener = TcpListener::bind(("127.0.0.1", config.rpc_port))
        .await
        .map_err(|e| io_err(format!("127.0.0.1:{}", config.rpc_port), e))?;
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "rpc server listening"),
        Err(err) => warn!(error = %err, "rpc listener address unavailable"),
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            let result = serve(listener, registry, probe, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!(
                            "ctrl-c handler failed: {err}"
                        ))),
                    }
                }
            }
        })
    };

    let (server_result, signal_result) = tokio::join!(server_handle, signal_handle);

    // Reap the daemon before reporting task results so the process is never
    // left behind, whatever took the runtime down.
    if supervisor.is_running() {
        if let Err(err) = supervisor.stop().await {
            warn!(error = %err, "daemon stop reported an error during shutdown");
        }
    }

    handle_join("rpc_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
