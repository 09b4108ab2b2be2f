/// Current-user session cell
///
/// Exactly one session exists per service graph. The auth service owns the
/// [`SessionController`] (the only writer); every other component receives
/// a cloneable [`SessionHandle`] that can read the current user
/// synchronously or observe changes as a stream.
///
/// # Example
///
/// ```
/// use stocktake_shared::auth::session;
///
/// let (controller, handle) = session::channel();
/// assert!(handle.current().is_none());
///
/// let mut changes = handle.subscribe();
/// controller.clear();
/// assert!(changes.has_changed().unwrap());
/// ```

use crate::models::User;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Creates a linked writer/reader pair around an empty session
pub fn channel() -> (SessionController, SessionHandle) {
    let (tx, _rx) = watch::channel(None);
    let tx = Arc::new(tx);
    (
        SessionController { tx: Arc::clone(&tx) },
        SessionHandle { tx },
    )
}

/// Write side of the session, held by the auth service
#[derive(Debug)]
pub struct SessionController {
    tx: Arc<watch::Sender<Option<User>>>,
}

impl SessionController {
    /// Starts a session; credentials are stripped before storing
    pub fn set(&self, user: &User) {
        self.tx.send_replace(Some(user.sanitized()));
    }

    /// Ends the session
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Read side linked to this controller
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: Arc::clone(&self.tx),
        }
    }
}

/// Read side of the session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Option<User>>>,
}

impl SessionHandle {
    /// Snapshot of the current user; never blocks or prompts
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    /// Id of the current user
    pub fn current_user_id(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|user| user.id.clone())
    }

    /// Whether someone is signed in
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Receiver notified on every sign-in and sign-out
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    /// Current user followed by every later change, as a stream
    pub fn stream(&self) -> WatchStream<Option<User>> {
        WatchStream::new(self.subscribe())
    }
}
