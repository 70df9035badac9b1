//! podsync daemon runtime: sync-daemon supervisor, log relays, RPC server.

mod error;
pub mod install;
pub mod paths;
pub mod process;
pub mod protocol;
pub mod relay;
mod runtime;
mod server;
mod supervisor;

pub use error::DaemonError;
pub use install::{InstallError, Installer};
pub use process::ProcessHandle;
pub use protocol::{
    request_await_alive, request_spec_list, send_request, RpcError, RpcErrorKind, RpcRequest,
    RpcResponse,
};
pub use relay::{LogSink, RelaySeverity, TracingSink};
pub use runtime::{run, start_blocking, RuntimeConfig};
pub use server::{serve, LivenessProbe};
pub use supervisor::{DaemonSupervisor, EndpointHandle, SupervisorConfig};
