//! The named, process-wide mutex backing registry cache refreshes.
//!
//! Per spec §5/§9, the lock's *name* is part of the contract: in a
//! multi-process deployment sharing a storage backend, the name identifies
//! the coordination point an external lock service would key on. In a
//! single process, this is the one mutex every registry refresh actually
//! contends on — an async [`tokio::sync::Mutex`], since a refresh holds it
//! across the backend read.

use tokio::sync::{Mutex, MutexGuard};

/// A named mutex. The name is part of the coordination contract, not just
/// a label: call sites acquire *this* lock to serialize cache refreshes,
/// rather than a private, unnamed one of their own.
pub struct NamedLock {
    name: &'static str,
    mutex: Mutex<()>,
}

impl NamedLock {
    /// Create a lock identified by `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            mutex: Mutex::new(()),
        }
    }

    /// The lock's name, as it would be passed to an external coordination
    /// service in a multi-process deployment.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Acquire the lock, awaiting the current holder's release if any.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}
