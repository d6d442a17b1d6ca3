//! Restricted view of the host runtime for embedded line editors.
//!
//! An editor may push work onto the host's executor, but it never owns the
//! runtime: lifecycle requests are swallowed, and it cannot watch file
//! descriptors itself because every byte reaches it by explicit push from a
//! bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use embsh_types::error::{Result, ShellError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// What an embedded editor is allowed to ask of the host: delegation only.
pub trait EditorExecutor: Send + Sync {
    /// Run blocking work on the host's blocking pool.
    fn run_in_executor<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;

    /// Schedule a callback to run on the host runtime.
    fn call_from_executor<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static;
}

/// Host runtime handle with lifecycle control removed.
#[derive(Debug, Clone)]
pub struct SchedulerFacade {
    handle: Handle,
    ignored: Arc<AtomicUsize>,
}

impl SchedulerFacade {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            ignored: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Facade over the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ShellError::Unsupported("a scheduler facade outside a tokio runtime"))
    }

    /// Accepted and ignored; the host keeps running.
    pub fn stop(&self) {
        log::debug!("ignoring stop request from embedded editor");
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Accepted and ignored; the host keeps running.
    pub fn close(&self) {
        log::debug!("ignoring close request from embedded editor");
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of lifecycle requests swallowed so far.
    pub fn ignored_requests(&self) -> usize {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Readiness registration is owned by the host.
    pub fn add_reader(&self, fd: i32) -> Result<()> {
        log::warn!("embedded editor tried to watch descriptor {fd}");
        Err(ShellError::Unsupported("add_reader"))
    }

    /// Readiness registration is owned by the host.
    pub fn remove_reader(&self, fd: i32) -> Result<()> {
        log::warn!("embedded editor tried to unwatch descriptor {fd}");
        Err(ShellError::Unsupported("remove_reader"))
    }
}

impl EditorExecutor for SchedulerFacade {
    fn run_in_executor<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn_blocking(f)
    }

    fn call_from_executor<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move { f() });
    }
}
