//! Line-by-line log relays for the daemon's output streams.
//!
//! Two independent relays run per supervised process: stdout at debug
//! severity, stderr at warning severity. Each relay preserves the line order
//! of its own stream; interleaving across the two is unordered. A relay ends
//! on its own when the stream reaches end-of-input, so stopping the daemon
//! needs no explicit cancellation signal.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::paths::LOG_SOURCE;

/// Severity a relay tags every forwarded line with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySeverity {
    /// Standard output stream.
    Debug,
    /// Standard error stream.
    Warning,
}

/// Destination for relayed lines. Must be safe for concurrent use: both
/// relays of one process share a single sink.
pub trait LogSink: Send + Sync {
    fn emit(&self, severity: RelaySeverity, line: &str);
}

/// Forwards relayed lines into `tracing`, tagged `source = "syncthing"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, severity: RelaySeverity, line: &str) {
        match severity {
            RelaySeverity::Debug => debug!(source = LOG_SOURCE, "{line}"),
            RelaySeverity::Warning => warn!(source = LOG_SOURCE, "{line}"),
        }
    }
}

/// Attach a relay task to `reader`, forwarding each complete line to `sink`.
///
/// The task exits cleanly at end-of-stream. A mid-stream read error is
/// logged and ends the relay; it is never escalated further.
pub fn attach<R>(reader: R, severity: RelaySeverity, sink: Arc<dyn LogSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => sink.emit(severity, &line),
                Ok(None) => break,
                Err(err) => {
                    warn!(source = LOG_SOURCE, error = %err, "relay read error, stopping relay");
                    break;
                }
            }
        }
        debug!(?severity, "log relay finished");
    })
}
