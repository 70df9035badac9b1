//! Lifecycle supervision for one background sync daemon instance.
//!
//! A supervisor owns at most one daemon process at a time and moves between
//! two states: Ready (no process) and Running. `run()` wipes the daemon's
//! persisted state, spawns the binary and attaches both log relays before
//! returning; `stop()` terminates, reaps and joins the relays before
//! reporting completion. Readiness of the daemon's control endpoint is not
//! awaited here; that rendezvous is the RPC layer's `await_alive`.

use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use podsync_core::Endpoint;

use crate::error::DaemonError;
use crate::install::Installer;
use crate::paths::{bin_path, config_xml_path, state_dir};
use crate::process::ProcessHandle;
use crate::relay::{self, LogSink, RelaySeverity, TracingSink};

/// Options for one supervised daemon instance, supplied explicitly by the
/// caller (no ambient configuration).
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Control-API bind port on localhost.
    pub port: u16,
    /// Control-API credential.
    pub api_key: String,
    /// Base directory for the installed binary and generated state.
    pub config_dir: PathBuf,
}

impl SupervisorConfig {
    fn control_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }
}

/// Shared, read-mostly view of the daemon's control endpoint.
///
/// Written only by the supervisor: published when the process starts,
/// cleared when it stops. The RPC liveness probe holds a clone.
#[derive(Debug, Clone, Default)]
pub struct EndpointHandle {
    inner: Arc<RwLock<Option<Endpoint>>>,
}

impl EndpointHandle {
    pub fn current(&self) -> Option<Endpoint> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, endpoint: Endpoint) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(endpoint);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

struct RunningDaemon {
    process: ProcessHandle,
    relays: Vec<JoinHandle<()>>,
}

pub struct DaemonSupervisor {
    config: SupervisorConfig,
    sink: Arc<dyn LogSink>,
    endpoint: EndpointHandle,
    running: Option<RunningDaemon>,
}

impl DaemonSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Like [`new`](Self::new) but with a caller-supplied log sink.
    pub fn with_sink(config: SupervisorConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            sink,
            endpoint: EndpointHandle::default(),
            running: None,
        }
    }

    /// Clone of the endpoint view to hand to the RPC liveness probe.
    pub fn endpoint_handle(&self) -> EndpointHandle {
        self.endpoint.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Whether the daemon binary exists at its expected installed location.
    /// Pure query; no side effect.
    pub fn has_binary(&self) -> bool {
        bin_path(&self.config.config_dir).is_file()
    }

    /// Delegate to the installer to place the binary. The installer's error
    /// is surfaced verbatim.
    pub fn fetch(&self, installer: &dyn Installer) -> Result<(), DaemonError> {
        installer
            .fetch(&bin_path(&self.config.config_dir))
            .map_err(DaemonError::from)
    }

    /// Wipe the daemon's persisted working directory and regenerate a fresh
    /// default configuration file.
    ///
    /// Runs unconditionally before every start: the daemon's internal state
    /// can desync from the declared spec list across restarts, and wiping it
    /// guarantees each run starts from the declared state. Idempotent.
    pub fn reset_state(&self) -> Result<(), DaemonError> {
        let state = state_dir(&self.config.config_dir);
        if state.exists() {
            fs::remove_dir_all(&state).map_err(|source| DaemonError::State {
                path: state.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&state).map_err(|source| DaemonError::State {
            path: state.clone(),
            source,
        })?;

        let config_xml = config_xml_path(&self.config.config_dir);
        let contents = default_config_xml(self.config.control_addr(), &self.config.api_key);
        fs::write(&config_xml, contents).map_err(|source| DaemonError::State {
            path: config_xml,
            source,
        })?;

        debug!(path = %state.display(), "daemon state reset");
        Ok(())
    }

    /// Start the daemon process and attach both log relays.
    ///
    /// Fails with `Prerequisite` before touching anything if the binary is
    /// missing (fetching is a separate explicit step). State reset completes
    /// fully before the spawn. Returns as soon as the process is started;
    /// readiness is observed later through the liveness RPC. On any failure
    /// the supervisor is left in Ready state, safe to retry.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        if self.running.is_some() {
            return Err(DaemonError::InvalidState {
                operation: "run",
                state: "running",
            });
        }
        if !self.has_binary() {
            return Err(DaemonError::Prerequisite);
        }

        self.reset_state()?;

        let addr = self.config.control_addr();
        let state = state_dir(&self.config.config_dir);
        // Flag spellings are the daemon binary's accepted contract.
        let args = vec![
            "-gui-address".to_owned(),
            addr.to_string(),
            "-gui-apikey".to_owned(),
            self.config.api_key.clone(),
            "-home".to_owned(),
            state.display().to_string(),
            "-no-browser".to_owned(),
        ];

        let binary = bin_path(&self.config.config_dir);
        info!(binary = %binary.display(), args = ?args, "starting sync daemon");
        let mut process = ProcessHandle::start(&binary, &args)?;

        let (stdout, stderr) = match (process.take_stdout(), process.take_stderr()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                // Relay attachment is fatal setup; tear the child down and
                // stay Ready.
                if let Err(err) = process.terminate() {
                    warn!(error = %err, "terminate after stream setup failure");
                }
                let _ = process.wait().await;
                return Err(DaemonError::Launch {
                    source: io::Error::new(io::ErrorKind::BrokenPipe, "daemon stdio unavailable"),
                });
            }
        };

        let relays = vec![
            relay::attach(stdout, RelaySeverity::Debug, self.sink.clone()),
            relay::attach(stderr, RelaySeverity::Warning, self.sink.clone()),
        ];

        self.endpoint.publish(Endpoint::new(addr));
        self.running = Some(RunningDaemon { process, relays });
        Ok(())
    }

    /// Terminate the daemon and reclaim every resource before returning.
    ///
    /// The wait step always runs, even when termination reports an error,
    /// so the OS process is reaped on every exit path. Both relay tasks are
    /// joined (they observe end-of-stream once the process dies) before the
    /// stop is reported complete; a termination failure is reported after
    /// cleanup rather than swallowed.
    pub async fn stop(&mut self) -> Result<(), DaemonError> {
        let Some(mut running) = self.running.take() else {
            return Err(DaemonError::InvalidState {
                operation: "stop",
                state: "ready",
            });
        };

        self.endpoint.clear();

        let terminated = running.process.terminate();
        if let Err(err) = &terminated {
            warn!(error = %err, "daemon terminate failed, still reaping");
        }

        match running.process.wait().await {
            Ok(status) => info!(?status, "sync daemon stopped"),
            Err(err) => warn!(error = %err, "wait after terminate failed"),
        }

        for relay in running.relays {
            if let Err(err) = relay.await {
                warn!(error = %err, "relay task join failed");
            }
        }

        terminated
    }

    /// Pid of the supervised process, if one is running.
    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(|r| r.process.id())
    }
}

/// Minimal default configuration accepted by the daemon on first start:
/// control API bound to localhost with the configured credential, browser
/// launch and global discovery disabled.
fn default_config_xml(addr: SocketAddr, api_key: &str) -> String {
    format!(
        r#"<configuration version="37">
    <gui enabled="true" tls="false">
        <address>{addr}</address>
        <apikey>{api_key}</apikey>
    </gui>
    <options>
        <startBrowser>false</startBrowser>
        <globalAnnounceEnabled>false</globalAnnounceEnabled>
        <localAnnounceEnabled>false</localAnnounceEnabled>
        <relaysEnabled>false</relaysEnabled>
        <natEnabled>false</natEnabled>
        <urAccepted>-1</urAccepted>
    </options>
</configuration>
"#
    )
}
