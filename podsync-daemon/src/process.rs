//! Low-level wrapper around the supervised OS process.
//!
//! A `ProcessHandle` only exists after a successful spawn, so "terminate a
//! process that was never started" is unrepresentable. The remaining failure
//! mode is terminating a process that has already exited, which surfaces as
//! [`DaemonError::Process`].

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use crate::error::DaemonError;

pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// Spawn `program` with `args`, stdout and stderr piped.
    ///
    /// Fails with [`DaemonError::Launch`] if the executable is missing or
    /// the OS refuses to spawn. `kill_on_drop` is the final safety net; the
    /// supervisor still terminates and reaps explicitly on every exit path.
    pub fn start(program: &Path, args: &[String]) -> Result<Self, DaemonError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::Launch { source })?;

        let pid = child.id();
        debug!(program = %program.display(), pid, "daemon process started");

        Ok(Self { child, pid })
    }

    /// Standard output stream; available exactly once after start.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Standard error stream; available exactly once after start.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Pid recorded at spawn time.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Send the kill signal without waiting for exit.
    ///
    /// Fails with [`DaemonError::Process`] if the process already exited.
    /// Callers must still [`wait`](Self::wait) afterwards so the OS process
    /// is reaped on every exit path.
    pub fn terminate(&mut self) -> Result<(), DaemonError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Err(DaemonError::Process(format!(
                "process {:?} already exited with {status}",
                self.pid
            ))),
            Ok(None) => self
                .child
                .start_kill()
                .map_err(|err| DaemonError::Process(format!("kill failed: {err}"))),
            Err(err) => Err(DaemonError::Process(format!("status check failed: {err}"))),
        }
    }

    /// Block until the process has fully exited and been reaped.
    pub async fn wait(&mut self) -> Result<ExitStatus, DaemonError> {
        self.child
            .wait()
            .await
            .map_err(|err| DaemonError::Process(format!("wait failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn start_missing_executable_is_launch_error() {
        let result = ProcessHandle::start(Path::new("/nonexistent/daemon"), &[]);
        assert!(matches!(result, Err(DaemonError::Launch { .. })));
    }

    #[tokio::test]
    async fn wait_captures_exit_status() {
        let mut handle =
            ProcessHandle::start(&sh(), &["-c".to_owned(), "exit 3".to_owned()]).expect("spawn");
        let status = handle.wait().await.expect("wait");
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn terminate_then_wait_reaps_long_running_process() {
        let mut handle =
            ProcessHandle::start(&sh(), &["-c".to_owned(), "sleep 60".to_owned()]).expect("spawn");
        let pid = handle.id().expect("pid");

        handle.terminate().expect("terminate");
        let status = handle.wait().await.expect("wait");
        assert!(!status.success());

        // After wait the process is reaped; the pid must be gone.
        #[cfg(target_os = "linux")]
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
        let _ = pid;
    }

    #[tokio::test]
    async fn terminate_after_exit_is_process_error() {
        let mut handle =
            ProcessHandle::start(&sh(), &["-c".to_owned(), "exit 0".to_owned()]).expect("spawn");
        handle.wait().await.expect("wait");
        assert!(matches!(
            handle.terminate(),
            Err(DaemonError::Process(_))
        ));
    }
}
