//! RPC server: accept loop, per-connection dispatch, liveness probe.
//!
//! Each connection is handled on its own task. Handlers never block
//! indefinitely except `await_alive`, which blocks only the calling
//! connection's task and is bounded by the configured liveness window.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::Duration;

use podsync_core::SpecRegistry;
use serde_json::json;

use crate::error::DaemonError;
use crate::paths::LIVENESS_POLL_INTERVAL;
use crate::protocol::{RpcErrorKind, RpcRequest, RpcResponse, CMD_AWAIT_ALIVE, CMD_GET_SPEC_LIST};
use crate::supervisor::EndpointHandle;

/// Polls the supervised daemon's published control endpoint until it accepts
/// a connection, bounded by `timeout`.
///
/// Daemon startup is asynchronous; this probe is the explicit rendezvous
/// point callers use instead of polling `get_spec_list`. Bounded even when
/// the daemon was never started (the endpoint stays unpublished and the
/// window elapses).
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    endpoint: EndpointHandle,
    timeout: Duration,
}

impl LivenessProbe {
    pub fn new(endpoint: EndpointHandle, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub async fn await_alive(&self) -> Result<(), DaemonError> {
        tokio::time::timeout(self.timeout, self.poll_until_reachable())
            .await
            .map_err(|_| DaemonError::LivenessTimeout {
                waited: self.timeout,
            })
    }

    async fn poll_until_reachable(&self) {
        loop {
            if let Some(endpoint) = self.endpoint.current() {
                if TcpStream::connect(endpoint.addr).await.is_ok() {
                    return;
                }
            }
            tokio::time::sleep(LIVENESS_POLL_INTERVAL).await;
        }
    }
}

/// Serve RPC requests until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    registry: SpecRegistry,
    probe: LivenessProbe,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, peer) = accepted
                    .map_err(|err| DaemonError::Protocol(format!("accept failed: {err}")))?;
                let registry = registry.clone();
                let probe = probe.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_client(stream, registry, probe).await {
                        tracing::error!(peer = %peer, error = %err, "rpc client error");
                    }
                });
            }
        }
    }
    Ok(())
}

async fn handle_client(
    stream: TcpStream,
    registry: SpecRegistry,
    probe: LivenessProbe,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| DaemonError::Protocol(format!("rpc read failed: {err}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch(&request, &registry, &probe).await,
            Err(err) => RpcResponse::error(
                RpcErrorKind::BadRequest,
                format!("invalid request JSON: {err}"),
            ),
        };

        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

async fn dispatch(
    request: &RpcRequest,
    registry: &SpecRegistry,
    probe: &LivenessProbe,
) -> RpcResponse {
    match request.cmd.as_str() {
        CMD_GET_SPEC_LIST => {
            // Clone under the lock, prune orphans outside of it.
            let snapshot = registry.snapshot().without_orphans();
            match serde_json::to_value(&snapshot) {
                Ok(value) => RpcResponse::ok(value),
                Err(err) => RpcResponse::error(
                    RpcErrorKind::Internal,
                    format!("failed to encode spec list: {err}"),
                ),
            }
        }
        CMD_AWAIT_ALIVE => match probe.await_alive().await {
            Ok(()) => RpcResponse::ok(json!({ "alive": true })),
            Err(err @ DaemonError::LivenessTimeout { .. }) => {
                RpcResponse::error(RpcErrorKind::LivenessTimeout, err.to_string())
            }
            Err(err) => RpcResponse::error(RpcErrorKind::Internal, err.to_string()),
        },
        other => RpcResponse::error(RpcErrorKind::BadRequest, format!("unknown command '{other}'")),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &RpcResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|err| DaemonError::Protocol(format!("rpc write failed: {err}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|err| DaemonError::Protocol(format!("rpc write failed: {err}")))?;
    writer
        .flush()
        .await
        .map_err(|err| DaemonError::Protocol(format!("rpc flush failed: {err}")))?;
    Ok(())
}
