//! A session shared between threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use sparrow_common::Request;
use sparrow_html::HtmlTree;

use crate::error::{Result, SessionError};
use crate::session::BrowserSession;

/// A cloneable handle to one [`BrowserSession`].
///
/// `open` and `submit` wait for a navigation started through another handle
/// to finish; `try_open` and `try_submit` fail with
/// [`SessionError::SessionBusy`] instead.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<BrowserSession>>,
}

impl SharedSession {
    /// Wrap `session`.
    #[must_use]
    pub fn new(session: BrowserSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// [`BrowserSession::open`], waiting for the session.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::open`].
    pub fn open(&self, url: &str) -> Result<Arc<HtmlTree>> {
        self.lock().open(url)
    }

    /// [`BrowserSession::submit`], waiting for the session.
    ///
    /// # Errors
    ///
    /// As [`BrowserSession::submit`].
    pub fn submit(&self, request: Request) -> Result<Arc<HtmlTree>> {
        self.lock().submit(request)
    }

    /// [`BrowserSession::open`] unless another navigation is running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionBusy`] if the session is in use, and
    /// the errors of [`BrowserSession::open`].
    pub fn try_open(&self, url: &str) -> Result<Arc<HtmlTree>> {
        self.try_lock()?.open(url)
    }

    /// [`BrowserSession::submit`] unless another navigation is running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionBusy`] if the session is in use, and
    /// the errors of [`BrowserSession::submit`].
    pub fn try_submit(&self, request: Request) -> Result<Arc<HtmlTree>> {
        self.try_lock()?.submit(request)
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut BrowserSession) -> R) -> R {
        f(&mut self.lock())
    }

    // A panic inside a navigation leaves the session in a consistent state:
    // history only changes in `commit`.
    fn lock(&self) -> MutexGuard<'_, BrowserSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock(&self) -> Result<MutexGuard<'_, BrowserSession>> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(SessionError::SessionBusy),
        }
    }
}

impl From<BrowserSession> for SharedSession {
    fn from(session: BrowserSession) -> Self {
        Self::new(session)
    }
}
