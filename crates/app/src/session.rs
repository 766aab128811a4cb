//! Session
//!
//! The session owner issues and replaces the bearer credential; every other
//! component only reads it. Consumers hold a [`SessionReader`], the owner holds
//! the [`SessionHandle`].

use std::{fmt, sync::Arc};

use tokio::sync::watch;
use zeroize::Zeroize;

/// Bearer credential issued by the authentication service.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token, rejecting blank values.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return None;
        }

        Some(Self(raw.trim().to_string()))
    }

    /// Raw token value for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(**redacted**)")
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<BearerToken>,
}

impl Session {
    /// Session without a credential.
    #[must_use]
    pub fn guest() -> Self {
        Self::default()
    }

    /// Session carrying a credential.
    #[must_use]
    pub fn authenticated(token: BearerToken) -> Self {
        Self {
            credential: Some(token),
        }
    }

    /// Credential, when signed in.
    pub fn credential(&self) -> Option<&BearerToken> {
        self.credential.as_ref()
    }

    /// Whether a credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }
}

/// Owner side of the session; replaces it wholesale on sign-in and sign-out.
#[derive(Debug)]
pub struct SessionHandle {
    sender: watch::Sender<Arc<Session>>,
}

impl SessionHandle {
    /// Starts with the given session.
    #[must_use]
    pub fn new(initial: Session) -> Self {
        let (sender, _receiver) = watch::channel(Arc::new(initial));

        Self { sender }
    }

    /// Replaces the current session.
    pub fn replace(&self, session: Session) {
        self.sender.send_replace(Arc::new(session));
    }

    /// Read-only view for consumers.
    pub fn reader(&self) -> SessionReader {
        SessionReader {
            receiver: self.sender.subscribe(),
        }
    }

    /// Current session.
    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.sender.borrow())
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(Session::guest())
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone)]
pub struct SessionReader {
    receiver: watch::Receiver<Arc<Session>>,
}

impl SessionReader {
    /// Current session.
    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Current credential, cloned out of the session.
    pub fn credential(&self) -> Option<BearerToken> {
        self.receiver.borrow().credential().cloned()
    }

    /// Whether a credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.receiver.borrow().is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(BearerToken::new("").is_none(), "empty token");
        assert!(BearerToken::new("   ").is_none(), "whitespace token");
        assert!(BearerToken::new("abc").is_some(), "non-blank token");
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = BearerToken::new("secret-value");

        let rendered = format!("{token:?}");

        assert!(!rendered.contains("secret-value"), "token leaked: {rendered}");
    }

    #[test]
    fn readers_see_replaced_sessions() {
        let handle = SessionHandle::default();
        let reader = handle.reader();

        assert!(!reader.is_authenticated(), "starts as guest");

        if let Some(token) = BearerToken::new("t1") {
            handle.replace(Session::authenticated(token));
        }

        assert!(reader.is_authenticated(), "reader should see sign-in");
        assert_eq!(reader.credential().as_ref().map(BearerToken::expose), Some("t1"));

        handle.replace(Session::guest());

        assert!(reader.credential().is_none(), "reader should see sign-out");
    }
}
