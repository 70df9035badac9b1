//! RPC wire contract: newline-delimited JSON over TCP.
//!
//! Two request/response operations, no streaming:
//! - `get_spec_list` — full consistent snapshot of the spec list
//! - `await_alive` — blocks until the supervised daemon's control endpoint
//!   is reachable, or returns a structured liveness error
//!
//! Error responses carry a coarse kind code plus a human-readable message,
//! never raw internal error detail.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use podsync_core::SpecList;

use crate::error::DaemonError;

pub const CMD_GET_SPEC_LIST: &str = "get_spec_list";
pub const CMD_AWAIT_ALIVE: &str = "await_alive";

/// Slack added to the client read timeout over the server-side liveness
/// window, so the structured timeout response arrives before the socket one.
const READ_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub cmd: String,
}

impl RpcRequest {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorKind {
    LivenessTimeout,
    BadRequest,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(RpcError {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Send one JSON request to the RPC server and return one response.
pub fn send_request(
    addr: SocketAddr,
    request: &RpcRequest,
    read_timeout: Duration,
) -> Result<RpcResponse, DaemonError> {
    let stream = TcpStream::connect(addr).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::ServerUnreachable { addr }
        } else {
            DaemonError::Protocol(format!("connect to {addr} failed: {err}"))
        }
    })?;
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|err| DaemonError::Protocol(format!("set read timeout: {err}")))?;

    let payload = serde_json::to_string(request)?;
    let mut writer = &stream;
    writer
        .write_all(payload.as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .and_then(|_| writer.flush())
        .map_err(|err| DaemonError::Protocol(format!("rpc write failed: {err}")))?;

    let mut reader = BufReader::new(&stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|err| DaemonError::Protocol(format!("rpc read failed: {err}")))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "server closed connection before responding".to_owned(),
        ));
    }

    let response: RpcResponse = serde_json::from_str(line.trim_end())?;
    Ok(response)
}

/// `get_spec_list`: fetch the full current spec list snapshot.
pub fn request_spec_list(addr: SocketAddr) -> Result<SpecList, DaemonError> {
    let response = send_request(
        addr,
        &RpcRequest::new(CMD_GET_SPEC_LIST),
        Duration::from_secs(10),
    )?;
    let data = response_into_data(response)?;
    serde_json::from_value(data).map_err(DaemonError::Json)
}

/// `await_alive`: block until the supervised daemon is reachable.
///
/// `liveness_timeout` must match (or exceed) the server's configured
/// liveness window; the read timeout is padded above it so the bounded-wait
/// guarantee holds even against a stalled server.
pub fn request_await_alive(
    addr: SocketAddr,
    liveness_timeout: Duration,
) -> Result<(), DaemonError> {
    let response = send_request(
        addr,
        &RpcRequest::new(CMD_AWAIT_ALIVE),
        liveness_timeout + READ_TIMEOUT_SLACK,
    )?;
    if response.ok {
        return Ok(());
    }
    match response.error {
        Some(RpcError {
            kind: RpcErrorKind::LivenessTimeout,
            ..
        }) => Err(DaemonError::LivenessTimeout {
            waited: liveness_timeout,
        }),
        Some(RpcError { message, .. }) => Err(DaemonError::Protocol(message)),
        None => Err(DaemonError::Protocol(
            "error response without error detail".to_owned(),
        )),
    }
}

fn response_into_data(response: RpcResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        let message = response
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "unknown server error".to_owned());
        Err(DaemonError::Protocol(message))
    }
}
