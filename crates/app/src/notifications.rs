//! Transient notifications
//!
//! Every cart action reports its outcome here. A notification replaces the
//! previous one and dismisses itself after the configured time to live.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{runtime::Handle, sync::watch};
use tracing::{info, warn};

/// Default time a notification stays visible.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(3_000);

/// Success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The action succeeded
    Success,

    /// The action failed
    Error,
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic identifier, used to avoid dismissing a newer notification
    pub id: u64,

    /// Success or failure
    pub kind: NotificationKind,

    /// Text shown to the user
    pub message: String,
}

#[derive(Debug)]
struct NotifierInner {
    sender: watch::Sender<Option<Notification>>,
    next_id: AtomicU64,
    ttl: Duration,
}

/// Publishes notifications to subscribed views.
#[derive(Debug, Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    /// Notifier whose messages disappear after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (sender, _receiver) = watch::channel(None);

        Self {
            inner: Arc::new(NotifierInner {
                sender,
                next_id: AtomicU64::new(1),
                ttl,
            }),
        }
    }

    /// Shows a success message.
    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Success, message.into())
    }

    /// Shows an error message.
    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Error, message.into())
    }

    /// Currently visible notification.
    pub fn current(&self) -> Option<Notification> {
        self.inner.sender.borrow().clone()
    }

    /// Subscribes to notification changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.sender.subscribe()
    }

    /// Dismisses the notification with the given id, if still visible.
    pub fn dismiss(&self, id: u64) {
        dismiss(&self.inner.sender, id);
    }

    fn push(&self, kind: NotificationKind, message: String) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        match kind {
            NotificationKind::Success => info!(id, %message, "notification"),
            NotificationKind::Error => warn!(id, %message, "notification"),
        }

        self.inner
            .sender
            .send_replace(Some(Notification { id, kind, message }));

        if let Ok(handle) = Handle::try_current() {
            let inner = Arc::clone(&self.inner);

            handle.spawn(async move {
                tokio::time::sleep(inner.ttl).await;
                dismiss(&inner.sender, id);
            });
        }

        id
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

fn dismiss(sender: &watch::Sender<Option<Notification>>, id: u64) {
    sender.send_if_modified(|current| {
        if current.as_ref().is_some_and(|notification| notification.id == id) {
            *current = None;
            return true;
        }

        false
    });
}
