//! Domain types for the podsync spec model.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. All types are serializable/deserializable via serde and compare
//! structurally, so a wire roundtrip yields an identical value.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Spec status at creation time.
pub const STATUS_INIT: &str = "init";
/// The daemon process has been launched but is not yet reachable.
pub const STATUS_STARTING: &str = "starting";
/// The local and remote folders are converging.
pub const STATUS_SYNCING: &str = "syncing";
/// Sync for this entry failed; see the daemon logs.
pub const STATUS_ERROR: &str = "error";
/// The supervisor stopped the daemon; no sync is in progress.
pub const STATUS_STOPPED: &str = "stopped";

/// Lifecycle status of a [`Spec`] or [`Service`].
///
/// The supervisor writes values from the fixed vocabulary above, but the
/// type stays an open string: free text must survive a wire roundtrip
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub String);

impl Status {
    pub fn is(&self, vocab: &str) -> bool {
        self.0 == vocab
    }
}

impl Default for Status {
    fn default() -> Self {
        Self(STATUS_INIT.to_owned())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Immutable-after-creation description of one sync task.
///
/// The two read-only flags mark a side the sync engine must never write to;
/// they travel with the details so the engine can enforce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDetails {
    pub name: String,
    pub container_name: String,
    pub pod_name: String,
    pub selector: String,
    pub namespace: String,
    /// Absolute path on the local machine.
    pub local_path: PathBuf,
    /// Absolute path inside the remote container.
    pub remote_path: PathBuf,
    /// Whether a discovered file change should restart the remote process.
    pub reload: bool,
    pub local_read_only: bool,
    pub remote_read_only: bool,
}

/// Identity of the remote execution target.
///
/// Re-created, never mutated, when the underlying pod/container is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContainer {
    pub id: String,
    pub container_name: String,
    pub node_name: String,
    pub pod_name: String,
}

/// One concrete remote binding realizing part of a [`Spec`].
///
/// `spec_key` is a lookup key into the owning [`SpecList`], not an owning
/// reference: a Service whose key no longer resolves is orphaned and is
/// dropped from reporting (see [`SpecList::without_orphans`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub spec_key: String,
    pub remote_container: RemoteContainer,
    pub status: Status,
}

/// Ordered sequence of [`Service`]; order reflects attachment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceList {
    #[serde(default)]
    pub items: Vec<Service>,
}

/// One declared sync task together with its remote bindings and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub details: SpecDetails,
    #[serde(default)]
    pub services: ServiceList,
    pub status: Status,
}

impl Spec {
    /// A freshly declared spec: no services yet, status `"init"`.
    pub fn new(details: SpecDetails) -> Self {
        Self {
            details,
            services: ServiceList::default(),
            status: Status::default(),
        }
    }
}

/// Top-level collection returned by the query RPC: unique string key → spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpecList {
    #[serde(default)]
    pub items: BTreeMap<String, Spec>,
}

impl SpecList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every service whose back-reference does not resolve to its
    /// owning entry. Lists built through `SpecRegistry` cannot contain
    /// orphans, but lists that arrived over the wire can.
    pub fn without_orphans(mut self) -> Self {
        for (key, spec) in self.items.iter_mut() {
            spec.services.items.retain(|s| &s.spec_key == key);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Where the supervised daemon's control API is reachable.
///
/// Constructed once per supervised daemon run and dropped when the daemon is
/// stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub addr: SocketAddr,
}

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            url: format!("http://{addr}"),
            addr,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
