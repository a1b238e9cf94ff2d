use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;

use corral_core::{ManagedProcess, OutputChunk, OutputSink, ProcessId};

/// How long a [`FakeProcess`] stays alive once launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Alive for this many `is_alive` checks, then terminal.
    Checks(usize),
    /// Alive until `kill` is called.
    UntilKilled,
}

#[derive(Default)]
struct FakeState {
    started: bool,
    killed: bool,
    alive_checks: usize,
    launches: usize,
    kills: usize,
    liveness_queries: usize,
    got_sink: Option<Arc<dyn OutputSink>>,
}

/// Scripted [`ManagedProcess`] that records every call made to it.
///
/// By default it terminates the moment it is launched. Use the builder
/// methods to keep it alive longer or to make launch/kill fail.
pub struct FakeProcess {
    id: ProcessId,
    liveness: Liveness,
    output: Vec<OutputChunk>,
    launch_error: Option<String>,
    kill_error: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeProcess {
    pub fn new(id: impl Into<ProcessId>) -> Self {
        Self {
            id: id.into(),
            liveness: Liveness::Checks(0),
            output: Vec::new(),
            launch_error: None,
            kill_error: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Stay alive for `checks` liveness queries after launch.
    pub fn alive_for(mut self, checks: usize) -> Self {
        self.liveness = Liveness::Checks(checks);
        self
    }

    /// Stay alive until killed.
    pub fn alive_until_killed(mut self) -> Self {
        self.liveness = Liveness::UntilKilled;
        self
    }

    /// Write `chunk` to the sink (if any) when launched.
    pub fn emitting(mut self, chunk: OutputChunk) -> Self {
        self.output.push(chunk);
        self
    }

    /// Make `run_async` fail with `message`.
    pub fn failing_launch(mut self, message: impl Into<String>) -> Self {
        self.launch_error = Some(message.into());
        self
    }

    /// Make `kill` fail with `message`.
    pub fn failing_kill(mut self, message: impl Into<String>) -> Self {
        self.kill_error = Some(message.into());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake process state poisoned")
    }

    /// Number of successful `run_async` calls.
    pub fn launches(&self) -> usize {
        self.state().launches
    }

    /// Number of `kill` calls, failed ones included.
    pub fn kills(&self) -> usize {
        self.state().kills
    }

    /// Number of `is_alive` calls.
    pub fn liveness_queries(&self) -> usize {
        self.state().liveness_queries
    }

    pub fn was_killed(&self) -> bool {
        self.state().killed
    }

    /// The sink passed to the most recent successful launch.
    pub fn received_sink(&self) -> Option<Arc<dyn OutputSink>> {
        self.state().got_sink.clone()
    }
}

#[async_trait]
impl ManagedProcess for FakeProcess {
    fn id(&self) -> ProcessId {
        self.id.clone()
    }

    async fn is_started(&self) -> bool {
        self.state().started
    }

    async fn is_alive(&self) -> bool {
        let mut state = self.state();
        state.liveness_queries += 1;
        if !state.started || state.killed {
            return false;
        }
        match self.liveness {
            Liveness::UntilKilled => true,
            Liveness::Checks(_) => {
                if state.alive_checks == 0 {
                    false
                } else {
                    state.alive_checks -= 1;
                    true
                }
            }
        }
    }

    async fn run_async(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<()> {
        if let Some(message) = &self.launch_error {
            bail!("{message}");
        }
        {
            let mut state = self.state();
            state.started = true;
            state.launches += 1;
            state.alive_checks = match self.liveness {
                Liveness::Checks(n) => n,
                Liveness::UntilKilled => 0,
            };
            state.got_sink = sink.clone();
        }
        if let Some(sink) = sink {
            for chunk in &self.output {
                sink.write(&self.id, chunk.clone());
            }
        }
        Ok(())
    }

    async fn kill(&self) -> Result<()> {
        let mut state = self.state();
        state.kills += 1;
        if let Some(message) = &self.kill_error {
            bail!("{message}");
        }
        state.killed = true;
        Ok(())
    }
}

impl std::fmt::Debug for FakeProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeProcess")
            .field("id", &self.id)
            .field("liveness", &self.liveness)
            .finish()
    }
}
