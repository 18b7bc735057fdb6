//! Call Lock Module
//!
//! One serialization scope per ledger instance. Guarded operations run one
//! at a time in a total order: callers on other threads wait their turn,
//! while a nested call from the thread already inside the scope (typically
//! via an asset-transfer hook) is rejected immediately with
//! `ReentrancyRejected`.
//!
//! The scope is held by a `CallGuard` and released when the guard drops,
//! on success and failure paths alike.

use std::thread::{self, ThreadId};

use parking_lot::{Mutex, MutexGuard};

use crate::errors::{XPegError, XPegResult};

/// Per-instance serializer with re-entry detection
#[derive(Debug, Default)]
pub struct CallLock {
    serial: Mutex<()>,
    holder: Mutex<Option<ThreadId>>,
}

impl CallLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the scope, waiting for other threads; fails on re-entry
    pub fn enter(&self) -> XPegResult<CallGuard<'_>> {
        let me = thread::current().id();
        if *self.holder.lock() == Some(me) {
            return Err(XPegError::ReentrancyRejected);
        }

        let serial = self.serial.lock();
        *self.holder.lock() = Some(me);

        Ok(CallGuard { lock: self, _serial: serial })
    }

    /// Whether some guarded operation is currently executing
    pub fn is_entered(&self) -> bool {
        self.holder.lock().is_some()
    }
}

/// Scope token returned by `CallLock::enter`
#[derive(Debug)]
pub struct CallGuard<'a> {
    lock: &'a CallLock,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        // Cleared before `_serial` unlocks so the next holder starts clean
        *self.lock.holder.lock() = None;
    }
}
