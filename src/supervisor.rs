//! Relay process supervision
//!
//! This module drives the full lifecycle of one external relay process:
//! it obtains the executable payload, materializes it, starts the process
//! with both standard streams piped, pumps those streams into an optional
//! debug sink and blocks until the process exits.
//!
//! Each supervisor owns at most one process. There is no restart: `run`
//! consumes the supervisor, so a second run on the same instance does not
//! compile. Cancellation is advisory: [`StopHandle::stop`] sends the
//! platform interrupt and the child decides when to exit; `run` returns
//! only once it actually has.

use crate::asset::{AssetSource, RELAY_ASSET};
use crate::error::RelayError;
use crate::exec::ByteExecutable;
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

/// Buffer size for draining child output streams
const STREAM_BUFFER_SIZE: usize = 4096;

/// Destination for the child's standard output and error streams
///
/// Both streams drain into the same sink. Byte order within one stream is
/// preserved; interleaving between stdout and stderr is arbitrary.
pub type DebugSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Policy applied when a stream copy loop fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPolicy {
    /// A copy error ends that stream's loop and is otherwise ignored
    #[default]
    Silent,
    /// A copy error requests termination of the relay process
    FailFast,
}

/// Clone-able handle that can request termination of a supervised process
///
/// The handle is valid in every lifecycle state: before the process starts
/// and after it exits, [`stop`](StopHandle::stop) is a silent no-op.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    // 0 means no live process; a pid is published for the started child
    // and cleared once its exit has been observed.
    pid: Arc<AtomicU32>,
}

impl StopHandle {
    /// Create a handle not yet bound to any process
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination of the supervised process
    ///
    /// Sends the platform interrupt to the child if one is running; with no
    /// live process this does nothing. Fire-and-forget: the call never
    /// blocks, never fails, and does not wait for the child to exit.
    /// Redundant calls send at worst a redundant interrupt.
    pub fn stop(&self) {
        let pid = self.pid.load(Ordering::Acquire);
        if pid == 0 {
            return;
        }
        send_interrupt(pid);
    }

    fn bind(&self, pid: u32) {
        self.pid.store(pid, Ordering::Release);
    }

    fn clear(&self) {
        self.pid.store(0, Ordering::Release);
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // ESRCH here just means the child exited between the pid load and the
    // kill; best-effort either way.
    if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        debug!("interrupt for relay process {} not delivered: {}", pid, err);
    }
}

#[cfg(not(unix))]
fn send_interrupt(pid: u32) {
    warn!(
        "interrupt requested for relay process {} but this platform has no SIGINT equivalent",
        pid
    );
}

/// Supervisor for one external relay process
pub struct Supervisor {
    source: Box<dyn AssetSource>,
    stop: StopHandle,
}

impl Supervisor {
    /// Create a supervisor obtaining the relay payload from `source`
    pub fn new(source: Box<dyn AssetSource>) -> Self {
        Self::with_handle(source, StopHandle::new())
    }

    /// Create a supervisor publishing its process into an existing handle
    pub fn with_handle(source: Box<dyn AssetSource>, stop: StopHandle) -> Self {
        Self { source, stop }
    }

    /// Handle that can request termination of the supervised process
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the relay process to completion
    ///
    /// Obtains and materializes the payload (both fail-fast, before any
    /// process exists), starts the process with `params`, pumps stdout and
    /// stderr into `debug_out` (discarded when `None`) and blocks until the
    /// process exits. A message on `shutdown` is translated into an
    /// interrupt for the child; the return value stays gated on the child's
    /// own exit.
    pub async fn run(
        self,
        params: &[String],
        debug_out: Option<DebugSink>,
        policy: OutputPolicy,
        mut shutdown: broadcast::Receiver<bool>,
    ) -> Result<(), RelayError> {
        let payload = self.source.asset(RELAY_ASSET)?;
        let exe = ByteExecutable::new(&payload)?;

        let mut cmd = exe.command(params);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(RelayError::Spawn)?;

        let stdout = match child.stdout.take() {
            Some(stream) => stream,
            None => {
                let _ = child.start_kill();
                return Err(RelayError::PipeSetup { stream: "stdout" });
            }
        };
        let stderr = match child.stderr.take() {
            Some(stream) => stream,
            None => {
                let _ = child.start_kill();
                return Err(RelayError::PipeSetup { stream: "stderr" });
            }
        };

        if let Some(pid) = child.id() {
            self.stop.bind(pid);
        }
        debug!("relay process started: pid {:?} params {:?}", child.id(), params);

        let sink = debug_out.map(|writer| Arc::new(Mutex::new(writer)));
        let stdout_pump = tokio::spawn(pump_stream(
            stdout,
            sink.clone(),
            policy,
            self.stop.clone(),
        ));
        let stderr_pump = tokio::spawn(pump_stream(stderr, sink, policy, self.stop.clone()));

        // The shutdown branch disarms itself after the first result so a
        // closed channel cannot spin the loop.
        let mut shutdown_armed = true;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                result = shutdown.recv(), if shutdown_armed => {
                    shutdown_armed = false;
                    match result {
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            debug!("shutdown requested, interrupting relay process");
                            self.stop.stop();
                        }
                        Err(broadcast::error::RecvError::Closed) => {}
                    }
                }
            }
        };
        self.stop.clear();

        let status = status.map_err(RelayError::Wait)?;
        let _ = stdout_pump.await;
        let _ = stderr_pump.await;
        debug!("relay process exited: {}", status);

        if status.success() {
            Ok(())
        } else {
            Err(RelayError::ChildExit(status))
        }
    }
}

/// Drain one child stream into the shared sink until end of stream
async fn pump_stream<R>(
    mut stream: R,
    sink: Option<Arc<Mutex<DebugSink>>>,
    policy: OutputPolicy,
    stop: StopHandle,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; STREAM_BUFFER_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(sink) = &sink {
                    let mut writer = sink.lock().await;
                    if let Err(err) = writer.write_all(&buf[..n]).await {
                        handle_copy_error(err, policy, &stop);
                        break;
                    }
                    let _ = writer.flush().await;
                }
            }
            Err(err) => {
                handle_copy_error(err, policy, &stop);
                break;
            }
        }
    }
}

fn handle_copy_error(err: io::Error, policy: OutputPolicy, stop: &StopHandle) {
    match policy {
        OutputPolicy::Silent => debug!("relay output copy ended: {}", err),
        OutputPolicy::FailFast => {
            warn!("relay output copy failed, stopping relay: {}", err);
            stop.stop();
        }
    }
}
