//! The `ManagedProcess` trait -- the capability a pool member exposes.
//!
//! The trait is object-safe so members can be stored as
//! `Arc<dyn ManagedProcess>` inside a [`crate::Pool`] while the caller
//! keeps its own handle to the same process.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::sink::OutputSink;
use super::types::ProcessId;

/// An externally running unit of work that a pool can supervise.
///
/// Implementors own the actual execution (an OS child, a container, a
/// remote job). The pool only queries and commands it through these
/// methods.
#[async_trait]
pub trait ManagedProcess: Send + Sync {
    /// Stable identifier, unique among the members of one pool.
    fn id(&self) -> ProcessId;

    /// Whether `run_async` has already launched this process.
    async fn is_started(&self) -> bool;

    /// Whether the process is still running.
    ///
    /// Must return `false` once the process reached a terminal state
    /// (completed, crashed, or killed), and for a process never started.
    async fn is_alive(&self) -> bool;

    /// Launch the process without waiting for it to finish.
    ///
    /// `sink` may be `None`; the adapter must then discard or otherwise
    /// handle output on its own.
    async fn run_async(&self, sink: Option<Arc<dyn OutputSink>>) -> Result<()>;

    /// Terminate the process.
    ///
    /// Killing a process that is not running (never started or already
    /// finished) must succeed as a no-op.
    async fn kill(&self) -> Result<()>;
}

// Compile-time assertion: ManagedProcess must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ManagedProcess) {}
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// A process that finishes the moment it is launched.
    struct InstantProcess {
        started: AtomicBool,
    }

    #[async_trait]
    impl ManagedProcess for InstantProcess {
        fn id(&self) -> ProcessId {
            ProcessId::from("instant")
        }

        async fn is_started(&self) -> bool {
            self.started.load(Ordering::SeqCst)
        }

        async fn is_alive(&self) -> bool {
            false
        }

        async fn run_async(&self, _sink: Option<Arc<dyn OutputSink>>) -> Result<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn kill(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_object_round_trip() {
        let process: Arc<dyn ManagedProcess> = Arc::new(InstantProcess {
            started: AtomicBool::new(false),
        });

        assert_eq!(process.id().as_str(), "instant");
        assert!(!process.is_started().await);

        process.run_async(None).await.unwrap();
        assert!(process.is_started().await);
        assert!(!process.is_alive().await);

        // Killing a finished process is a no-op.
        process.kill().await.unwrap();
    }
}
