//! Remote confirmation of local cart changes.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::http::GatewayError;

/// Final state of a remote confirmation.
#[derive(Debug)]
pub enum SyncStatus {
    /// No credential; the change only exists locally.
    LocalOnly,

    /// The server accepted the change.
    Confirmed,

    /// The server call failed; the local value stands until the next hydrate.
    Failed(GatewayError),

    /// The confirmation task ended without reporting (panic or runtime
    /// shutdown).
    Interrupted,
}

impl SyncStatus {
    /// Whether the server has the change.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Handle on the background gateway call that follows a local change.
///
/// Dropping the handle does not cancel the call.
#[derive(Debug)]
pub struct RemoteSync {
    task: Option<JoinHandle<SyncStatus>>,
}

impl RemoteSync {
    pub(crate) fn local_only() -> Self {
        Self { task: None }
    }

    pub(crate) fn spawn<F>(confirmation: F) -> Self
    where
        F: Future<Output = SyncStatus> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(confirmation)),
        }
    }

    /// Whether a gateway call was started.
    pub fn is_remote(&self) -> bool {
        self.task.is_some()
    }

    /// Waits for the gateway call to finish.
    pub async fn settled(self) -> SyncStatus {
        match self.task {
            Some(task) => task.await.unwrap_or(SyncStatus::Interrupted),
            None => SyncStatus::LocalOnly,
        }
    }
}
