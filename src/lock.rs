//! Per-resource reader/writer locking
//!
//! The lock manager maps canonical resource paths to reader/writer locks,
//! created lazily on first use and retained for the manager's lifetime. Any
//! number of readers may hold a lock at once; a writer waits for every
//! holder to release and then excludes everyone else. Guards release on
//! drop, so locks are freed on every exit path.
//!
//! The manager is an explicitly constructed component, injected into the
//! storage engine at construction. Tests instantiate their own.

use crate::error::{Error, Result};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

/// Reader/writer lock for one resource path
#[derive(Default)]
struct PathLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl PathLock {
    /// Block on the condvar; false once the deadline has passed.
    fn block(&self, state: &mut MutexGuard<'_, LockState>, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                self.cond.wait(state);
                true
            }
            Some(d) => {
                if Instant::now() >= d {
                    return false;
                }
                !self.cond.wait_until(state, d).timed_out()
            }
        }
    }

    fn acquire_read(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        while state.writer {
            if !self.block(&mut state, deadline) && state.writer {
                return false;
            }
        }
        state.readers += 1;
        true
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    fn acquire_write(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.state.lock();
        while state.writer || state.readers > 0 {
            if !self.block(&mut state, deadline) && (state.writer || state.readers > 0) {
                return false;
            }
        }
        state.writer = true;
        true
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        state.writer = false;
        self.cond.notify_all();
    }
}

/// Shared read access to one resource, released on drop
pub struct ReadGuard {
    lock: Arc<PathLock>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Exclusive write access to one resource, released on drop
pub struct WriteGuard {
    lock: Arc<PathLock>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

/// Registry of per-resource reader/writer locks
#[derive(Default)]
pub struct LockManager {
    locks: DashMap<String, Arc<PathLock>>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, resource: &str) -> Arc<PathLock> {
        self.locks
            .entry(resource.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Acquire shared read access, blocking indefinitely
    pub fn read(&self, resource: &str) -> ReadGuard {
        let lock = self.lock_for(resource);
        lock.acquire_read(None);
        ReadGuard { lock }
    }

    /// Acquire exclusive write access, blocking indefinitely
    pub fn write(&self, resource: &str) -> WriteGuard {
        let lock = self.lock_for(resource);
        lock.acquire_write(None);
        WriteGuard { lock }
    }

    /// Acquire shared read access with a bound on the wait
    pub fn read_timeout(&self, resource: &str, timeout: Duration) -> Result<ReadGuard> {
        let lock = self.lock_for(resource);
        if lock.acquire_read(Some(Instant::now() + timeout)) {
            Ok(ReadGuard { lock })
        } else {
            Err(Error::LockTimeout(resource.to_string()))
        }
    }

    /// Acquire exclusive write access with a bound on the wait
    pub fn write_timeout(&self, resource: &str, timeout: Duration) -> Result<WriteGuard> {
        let lock = self.lock_for(resource);
        if lock.acquire_write(Some(Instant::now() + timeout)) {
            Ok(WriteGuard { lock })
        } else {
            Err(Error::LockTimeout(resource.to_string()))
        }
    }
}
