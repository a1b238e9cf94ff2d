//! Capability interface for processes supervised by a [`crate::Pool`].
//!
//! This module defines the [`ManagedProcess`] trait that every process
//! adapter implements, the [`OutputSink`] trait that receives a running
//! process's output, and the supporting [`ProcessId`] type.
//!
//! # Architecture
//!
//! ```text
//! Pool
//!     |
//!     |   manage(process) --> members[process.id()]
//!     |
//!     |   start(sink) ------> run_async(Some(sink) | None)
//!     |                            |
//!     |                            v
//!     |                       OutputSink::write(id, chunk)
//!     |
//!     |   join / has_alive -> is_alive()
//!     |   abandon ----------> kill()
//! ```

pub mod sink;
pub mod trait_def;
pub mod types;

pub use sink::{ChannelSink, OutputChunk, OutputSink, OutputStream};
pub use trait_def::ManagedProcess;
pub use types::ProcessId;
