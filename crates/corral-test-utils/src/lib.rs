//! Shared test utilities for corral tests.
//!
//! Provides scripted [`FakeProcess`] doubles, an in-memory
//! [`RecordingSink`], a [`ShellProcess`] backed by a real `sh -c` child
//! (Unix only), and one-time tracing setup for test binaries.

mod fake;
#[cfg(unix)]
mod shell;
mod sink;

use std::sync::{Arc, Once};

use corral_core::ManagedProcess;
use tracing_subscriber::EnvFilter;

pub use fake::{FakeProcess, Liveness};
#[cfg(unix)]
pub use shell::ShellProcess;
pub use sink::RecordingSink;

/// Install a test-friendly tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Clone a concrete process handle into the trait object a pool stores.
pub fn handle<P: ManagedProcess + 'static>(process: &Arc<P>) -> Arc<dyn ManagedProcess> {
    process.clone()
}
