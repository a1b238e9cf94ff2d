//! The pool coordinator: registers managed processes, launches them,
//! waits for them, and kills them.
//!
//! A [`Pool`] does no work of its own beyond bookkeeping and polling.
//! All execution happens inside the [`ManagedProcess`] implementations.
//!
//! The pool is single-owner: `manage` and `abandon` take `&mut self`,
//! the read-only operations take `&self`. Share it across tasks by
//! wrapping it in a mutex.

mod capacity;

pub use capacity::Capacity;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{Operation, PoolError, ProcessFailure};
use crate::process::{ManagedProcess, OutputSink, ProcessId};

/// Bounded or unbounded collection of managed processes.
///
/// Members are kept in registration order; `start`, `has_alive` and
/// `abandon` visit them in that order.
pub struct Pool {
    members: IndexMap<ProcessId, Arc<dyn ManagedProcess>>,
    capacity: Capacity,
    default_sink: Option<Arc<dyn OutputSink>>,
    poll_interval: Duration,
}

impl Pool {
    /// Interval between liveness scans in [`Pool::join`].
    pub const DEFAULT_POLL_INTERVAL: Duration =
        Duration::from_millis(PoolConfig::DEFAULT_POLL_INTERVAL_MS);

    /// Create an empty pool. A negative `capacity` means unbounded.
    pub fn new(capacity: i64) -> Self {
        let capacity = Capacity::from_limit(capacity);
        info!(capacity = ?capacity.remaining(), "pool created");
        Self {
            members: IndexMap::new(),
            capacity,
            default_sink: None,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a pool that accepts any number of processes.
    pub fn unbounded() -> Self {
        Self::new(-1)
    }

    /// Create a pool that accepts at most `limit` processes over its lifetime.
    pub fn bounded(limit: usize) -> Self {
        Self::new(i64::try_from(limit).unwrap_or(i64::MAX))
    }

    /// Build a pool from a validated [`PoolConfig`].
    pub fn from_config(
        config: &PoolConfig,
        default_sink: Option<Arc<dyn OutputSink>>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let limit = match config.capacity {
            Some(capacity) => i64::try_from(capacity)
                .map_err(|_| PoolError::Config(format!("capacity {capacity} is too large")))?,
            None => -1,
        };
        let mut pool = Self::new(limit).with_poll_interval(config.poll_interval_duration());
        pool.default_sink = default_sink;
        Ok(pool)
    }

    /// Set the sink handed to processes when `start` gets no override.
    pub fn with_default_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.default_sink = Some(sink);
        self
    }

    /// Set the interval between liveness scans in `join`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Register processes, spending one unit of budget per process.
    ///
    /// Registration is committed per element: if the budget runs out
    /// halfway through `processes`, the ones before the failing element
    /// stay managed and the rest are dropped. Use
    /// [`Pool::manage_atomic`] for all-or-nothing batches.
    ///
    /// A process whose id is already managed replaces the earlier handle
    /// and keeps its original position.
    pub fn manage(
        &mut self,
        processes: impl IntoIterator<Item = Arc<dyn ManagedProcess>>,
    ) -> Result<&mut Self, PoolError> {
        for process in processes {
            let id = process.id();
            if let Err(remaining) = self.capacity.consume() {
                warn!(process_id = %id, remaining, "pool capacity exceeded");
                return Err(PoolError::CapacityExceeded { remaining });
            }
            self.insert(id, process);
        }
        Ok(self)
    }

    /// Register a batch only if all of it fits in the remaining budget.
    ///
    /// On rejection nothing is registered and no budget is spent; the
    /// error reports the budget the batch would have left behind.
    pub fn manage_atomic(
        &mut self,
        processes: impl IntoIterator<Item = Arc<dyn ManagedProcess>>,
    ) -> Result<&mut Self, PoolError> {
        let batch: Vec<_> = processes.into_iter().collect();
        if let Err(remaining) = self.capacity.check(batch.len()) {
            warn!(batch = batch.len(), remaining, "pool capacity exceeded, batch rejected");
            return Err(PoolError::CapacityExceeded { remaining });
        }
        self.manage(batch)
    }

    fn insert(&mut self, id: ProcessId, process: Arc<dyn ManagedProcess>) {
        if self.members.insert(id.clone(), process).is_some() {
            debug!(process_id = %id, "replaced managed process with the same id");
        } else {
            debug!(process_id = %id, "managing process");
        }
    }

    /// Launch every member that has not been started yet.
    ///
    /// `sink` overrides the pool's default sink for this call. Already
    /// started members are skipped. Every unstarted member is attempted
    /// even if an earlier one fails to launch; the failures are returned
    /// together.
    pub async fn start(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<(), PoolError> {
        let sink = sink.or_else(|| self.default_sink.clone());
        let mut failures = Vec::new();
        let mut launched = 0usize;

        for (id, process) in &self.members {
            if process.is_started().await {
                debug!(process_id = %id, "already started, skipping");
                continue;
            }
            match process.run_async(sink.clone()).await {
                Ok(()) => {
                    launched += 1;
                    debug!(process_id = %id, "launched managed process");
                }
                Err(error) => {
                    warn!(process_id = %id, error = %error, "failed to launch managed process");
                    failures.push(ProcessFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }

        debug!(launched, failed = failures.len(), "pool start finished");
        collect_failures(Operation::Start, failures)
    }

    /// Wait until no member reports itself alive.
    ///
    /// Scans every member, sleeps for the poll interval if any is alive,
    /// and returns on the first scan that finds none. There is no
    /// timeout: a member that never terminates keeps this pending
    /// forever. See [`Pool::join_within`].
    pub async fn join(&self) {
        let mut scans: u64 = 1;
        while self.has_alive().await {
            tokio::time::sleep(self.poll_interval).await;
            scans += 1;
        }
        debug!(members = self.members.len(), scans, "all managed processes terminated");
    }

    /// Like [`Pool::join`], but give up after `limit`.
    ///
    /// Members are left untouched on timeout so the caller can decide
    /// whether to [`Pool::abandon`] them.
    pub async fn join_within(&self, limit: Duration) -> Result<(), PoolError> {
        tokio::time::timeout(limit, self.join())
            .await
            .map_err(|_| {
                warn!(waited = ?limit, "managed processes still alive after deadline");
                PoolError::JoinTimedOut { waited: limit }
            })
    }

    /// Whether any member is still alive. `false` for an empty pool.
    pub async fn has_alive(&self) -> bool {
        for process in self.members.values() {
            if process.is_alive().await {
                return true;
            }
        }
        false
    }

    /// Kill every member, then forget all of them.
    ///
    /// Kill requests go out to all members concurrently, whatever state
    /// they are in. Membership is cleared once every request has
    /// returned, including when some of them failed; the failures are
    /// reported afterwards. The pool is not meant to be reused.
    pub async fn abandon(&mut self) -> Result<(), PoolError> {
        let kills = self.members.iter().map(|(id, process)| async move {
            (id.clone(), process.kill().await)
        });
        let results = join_all(kills).await;

        let abandoned = self.members.len();
        self.members.clear();

        let failures: Vec<ProcessFailure> = results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(error) => {
                    warn!(process_id = %id, error = %error, "failed to kill managed process");
                    Some(ProcessFailure { id, error })
                }
            })
            .collect();

        info!(abandoned, failed = failures.len(), "pool abandoned");
        collect_failures(Operation::Abandon, failures)
    }

    /// Number of managed processes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Return `true` if no processes are managed.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ids of all managed processes, in registration order.
    pub fn ids(&self) -> Vec<&ProcessId> {
        self.members.keys().collect()
    }

    pub fn contains(&self, id: &ProcessId) -> bool {
        self.members.contains_key(id)
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Remaining registration budget, or `None` when unbounded.
    pub fn remaining_capacity(&self) -> Option<i64> {
        self.capacity.remaining()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .field("capacity", &self.capacity)
            .field("default_sink", &self.default_sink.is_some())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

fn collect_failures(operation: Operation, failures: Vec<ProcessFailure>) -> Result<(), PoolError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PoolError::Collaborator {
            operation,
            failures,
        })
    }
}
