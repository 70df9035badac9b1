use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::install::InstallError;

/// Error surface for daemon supervision, state reset, and the RPC protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The daemon binary is not installed; recoverable by running fetch.
    #[error("missing prerequisites: daemon binary not installed, run fetch first")]
    Prerequisite,

    /// The installer collaborator failed; surfaced verbatim, never retried.
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    /// Reset of persisted daemon state failed; the daemon must not start.
    #[error("failed to reset daemon state at {path}: {source}")]
    State {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to spawn the daemon process.
    #[error("failed to launch daemon process: {source}")]
    Launch {
        #[source]
        source: std::io::Error,
    },

    /// Termination or wait failed; logged, cleanup continues.
    #[error("daemon process error: {0}")]
    Process(String),

    /// Operation invoked in the wrong lifecycle state; programmer error.
    #[error("cannot {operation} while supervisor is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The daemon control endpoint did not become reachable in time.
    #[error("daemon did not become reachable within {waited:?}")]
    LivenessTimeout { waited: Duration },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rpc server is not reachable at {addr}")]
    ServerUnreachable { addr: SocketAddr },

    #[error("rpc protocol error: {0}")]
    Protocol(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
