//! Bounded pool for coordinating the lifecycle of external processes.
//!
//! The [`pool::Pool`] registers [`process::ManagedProcess`] handles,
//! launches them, waits for all of them to terminate, and kills them on
//! demand. Spawning and output handling live behind the traits in
//! [`process`].

pub mod config;
pub mod error;
pub mod pool;
pub mod process;

pub use config::PoolConfig;
pub use error::{Operation, PoolError, ProcessFailure};
pub use pool::{Capacity, Pool};
pub use process::{ChannelSink, ManagedProcess, OutputChunk, OutputSink, OutputStream, ProcessId};
