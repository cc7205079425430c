//! Shared link handle
//!
//! The reader and the control channel share one transport. Each holder locks
//! it for a single read or a single command exchange and releases the lock
//! fairly, so a waiting control exchange gets the link before the reader's
//! next read.
//!
//! Every exclusive exchange bumps an epoch. The reader compares epochs across
//! its reads to learn that bytes went to someone else in between.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::transport::Transport;

/// Exclusive access to the open link, if any
#[derive(Clone, Default)]
pub struct SharedLink {
    inner: Arc<Mutex<Option<Box<dyn Transport>>>>,
    epoch: Arc<AtomicU64>,
}

impl SharedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly opened transport, replacing (and closing) any previous one
    pub fn install(&self, transport: Box<dyn Transport>) {
        let previous = self.inner.lock().replace(transport);
        drop(previous);
    }

    /// Remove the transport; dropping the returned value closes it
    pub fn take(&self) -> Option<Box<dyn Transport>> {
        self.inner.lock().take()
    }

    /// Whether a transport is installed
    pub fn is_open(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Run `f` with the transport locked, then hand the lock over fairly
    ///
    /// Returns `None` when no transport is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> Option<R> {
        self.locked(f)
    }

    /// [`with`](Self::with), also returning the epoch seen under the lock
    pub fn with_epoch<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> Option<(u64, R)> {
        self.locked(|transport| (self.epoch(), f(transport)))
    }

    /// Run an exchange that consumes link bytes on its own behalf
    ///
    /// Bumps the epoch while the lock is held.
    pub fn exchange<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> Option<R> {
        self.locked(|transport| {
            self.epoch.fetch_add(1, Ordering::AcqRel);
            f(transport)
        })
    }

    /// Exchanges run so far
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn locked<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        let result = guard.as_mut().map(|transport| f(transport.as_mut()));
        MutexGuard::unlock_fair(guard);
        result
    }
}

impl fmt::Debug for SharedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLink")
            .field("open", &self.is_open())
            .field("epoch", &self.epoch())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::LinkOpener;

    #[test]
    fn test_with_requires_installed_transport() {
        let link = SharedLink::new();
        assert!(link.with(|t| t.flush()).is_none());

        let mock = MockTransport::new();
        link.install(Box::new(mock.clone()));
        assert!(link.is_open());

        let written = link.with(|t| t.write_all(&[1, 2, 3]));
        assert!(matches!(written, Some(Ok(()))));
        assert_eq!(mock.written(), [1, 2, 3]);
    }

    #[test]
    fn test_exchange_bumps_epoch() {
        let link = SharedLink::new();
        assert!(link.exchange(|t| t.flush()).is_none());
        assert_eq!(link.epoch(), 0);

        link.install(Box::new(MockTransport::new()));
        let (before, _) = link.with_epoch(|t| t.flush()).unwrap();
        assert!(link.exchange(|t| t.flush()).is_some());
        let (after, _) = link.with_epoch(|t| t.flush()).unwrap();

        assert_eq!(before, 0);
        assert_eq!(after, 1);
        assert_eq!(link.epoch(), 1);
    }

    #[test]
    fn test_take_closes_link() {
        let mock = MockTransport::new();
        let link = SharedLink::new();
        link.install(mock.opener().open().unwrap());

        drop(link.take());
        assert!(mock.is_closed());
        assert!(!link.is_open());
    }
}
