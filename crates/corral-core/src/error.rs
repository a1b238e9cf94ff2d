use std::fmt;
use std::time::Duration;

use crate::process::ProcessId;

/// Pool operation during which a collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Abandon,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Abandon => f.write_str("abandon"),
        }
    }
}

/// A single member's failure, as reported by its [`crate::ManagedProcess`].
#[derive(Debug)]
pub struct ProcessFailure {
    pub id: ProcessId,
    pub error: anyhow::Error,
}

/// Errors returned by [`crate::Pool`] operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The bounded budget ran out. `remaining` is the budget after the
    /// rejected registration and is always negative.
    #[error("pool capacity exceeded (remaining budget {remaining})")]
    CapacityExceeded { remaining: i64 },

    /// One or more members failed during `operation`. Every member was
    /// still attempted.
    #[error("{} managed process(es) failed during {operation}: {}", .failures.len(), summarize(.failures))]
    Collaborator {
        operation: Operation,
        failures: Vec<ProcessFailure>,
    },

    #[error("members still alive after waiting {waited:?}")]
    JoinTimedOut { waited: Duration },

    #[error("invalid pool config: {0}")]
    Config(String),
}

fn summarize(failures: &[ProcessFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {:#}", f.id, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_carries_remaining() {
        let err = PoolError::CapacityExceeded { remaining: -1 };
        assert_eq!(err.to_string(), "pool capacity exceeded (remaining budget -1)");
    }

    #[test]
    fn collaborator_message_lists_every_failure() {
        let err = PoolError::Collaborator {
            operation: Operation::Abandon,
            failures: vec![
                ProcessFailure {
                    id: ProcessId::from("a"),
                    error: anyhow::anyhow!("permission denied"),
                },
                ProcessFailure {
                    id: ProcessId::from("b"),
                    error: anyhow::anyhow!("no such process"),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 managed process(es) failed during abandon"), "{msg}");
        assert!(msg.contains("a: permission denied"), "{msg}");
        assert!(msg.contains("b: no such process"), "{msg}");
    }
}
