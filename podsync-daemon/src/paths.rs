//! Filesystem layout under the configured base directory.
//!
//! ```text
//! <config_dir>/
//!   bin/
//!     syncthing        (installed daemon binary)
//!   syncthing/
//!     config.xml       (regenerated by reset_state before every run)
//!     ...              (daemon-owned databases, wiped on reset)
//! ```
//!
//! All paths derive from an explicit `config_dir` supplied by the caller;
//! there is no ambient global configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed source name attached to every relayed daemon log line.
pub const LOG_SOURCE: &str = "syncthing";

pub const DAEMON_BINARY: &str = "syncthing";
pub const CONFIG_XML: &str = "config.xml";

/// How often the liveness probe retries the daemon control endpoint.
pub const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default bound on `await_alive` before it reports a liveness timeout.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(30);

/// `<config_dir>/bin/syncthing` — expected installed binary location.
pub fn bin_path(config_dir: &Path) -> PathBuf {
    config_dir.join("bin").join(DAEMON_BINARY)
}

/// `<config_dir>/syncthing/` — the daemon's persisted working directory.
pub fn state_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("syncthing")
}

/// `<config_dir>/syncthing/config.xml` — regenerated default configuration.
pub fn config_xml_path(config_dir: &Path) -> PathBuf {
    state_dir(config_dir).join(CONFIG_XML)
}
