use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use corral_core::{ManagedProcess, OutputChunk, OutputSink, OutputStream, ProcessId};

/// How long `kill` waits after SIGTERM before escalating to SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// [`ManagedProcess`] running a shell snippet via `sh -c`.
///
/// Each stdout/stderr line (newline included) is forwarded to the sink as
/// one [`OutputChunk`]. The shell leads its own process group, and `kill`
/// signals the whole group so commands it started go down with it.
pub struct ShellProcess {
    id: ProcessId,
    script: String,
    started: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl ShellProcess {
    pub fn new(id: impl Into<ProcessId>, script: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            script: script.into(),
            started: AtomicBool::new(false),
            child: Mutex::new(None),
        })
    }

    /// OS pid of the child, if it has been spawned and not yet reaped.
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }
}

fn forward_lines<R>(id: ProcessId, stream: OutputStream, reader: R, sink: Arc<dyn OutputSink>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let mut data = line.into_bytes();
                    data.push(b'\n');
                    sink.write(&id, OutputChunk::new(stream, data));
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(process_id = %id, error = %e, "error reading process output");
                    break;
                }
            }
        }
    });
}

/// Send `signal` to the process group led by `pid`.
fn signal_group(pid: u32, signal: libc::c_int) -> bool {
    // SAFETY: pid leads a group we created at spawn and have not reaped.
    unsafe { libc::kill(-(pid as libc::pid_t), signal) == 0 }
}

#[async_trait]
impl ManagedProcess for ShellProcess {
    fn id(&self) -> ProcessId {
        self.id.clone()
    }

    async fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        match child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | None => false,
            Some(Err(e)) => {
                warn!(process_id = %self.id, error = %e, "error checking process status");
                false
            }
        }
    }

    async fn run_async(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<()> {
        let mut slot = self.child.lock().await;
        if slot.is_some() {
            bail!("process {} was already launched", self.id);
        }

        let (stdout, stderr) = if sink.is_some() {
            (Stdio::piped(), Stdio::piped())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.script)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `sh -c {}`", self.script))?;

        if let Some(sink) = sink {
            if let Some(out) = child.stdout.take() {
                forward_lines(self.id.clone(), OutputStream::Stdout, out, Arc::clone(&sink));
            }
            if let Some(err) = child.stderr.take() {
                forward_lines(self.id.clone(), OutputStream::Stderr, err, sink);
            }
        }

        debug!(process_id = %self.id, pid = ?child.id(), "shell process spawned");
        *slot = Some(child);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn kill(&self) -> Result<()> {
        let mut slot = self.child.lock().await;
        let Some(child) = slot.as_mut() else {
            return Ok(());
        };
        if !matches!(child.try_wait(), Ok(None)) {
            return Ok(());
        }

        let pid = child.id();
        if let Some(pid) = pid {
            if !signal_group(pid, libc::SIGTERM) {
                warn!(process_id = %self.id, pid, "SIGTERM failed, proceeding to SIGKILL");
            }
        }

        match tokio::time::timeout(TERM_GRACE, child.wait()).await {
            Ok(Ok(_status)) => {
                debug!(process_id = %self.id, "process exited after SIGTERM");
            }
            _ => {
                debug!(process_id = %self.id, "process did not exit after SIGTERM, sending SIGKILL");
                if let Some(pid) = pid {
                    signal_group(pid, libc::SIGKILL);
                }
                child
                    .kill()
                    .await
                    .with_context(|| format!("failed to kill process {}", self.id))?;
            }
        }
        Ok(())
    }
}
