//! Current-user signal from the identity provider.
//!
//! The provider adapter owns a [`SessionPublisher`]; consumers hold
//! [`SessionSignal`] clones. "User present" is the sole gate for enabling
//! mutating UI; enforcement lives in the store's own access rules, so the
//! engine itself never checks this signal.

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Provider-adapter side: push sign-in/sign-out transitions.
pub struct SessionPublisher {
    tx: watch::Sender<Option<EditorUser>>,
}

/// Consumer side: read-only, subscribable view of the current user.
/// Dropping the signal (and its clones) unsubscribes.
#[derive(Clone)]
pub struct SessionSignal {
    rx: watch::Receiver<Option<EditorUser>>,
}

/// Create a linked publisher/signal pair with no user signed in.
pub fn session_channel() -> (SessionPublisher, SessionSignal) {
    let (tx, rx) = watch::channel(None);
    (SessionPublisher { tx }, SessionSignal { rx })
}

impl SessionPublisher {
    pub fn sign_in(&self, user: EditorUser) {
        tracing::info!("session: signed in uid={}", user.uid);
        // send only fails when every signal is dropped; nothing to do then
        let _ = self.tx.send(Some(user));
    }

    pub fn sign_out(&self) {
        tracing::info!("session: signed out");
        let _ = self.tx.send(None);
    }
}

impl SessionSignal {
    pub fn current(&self) -> Option<EditorUser> {
        self.rx.borrow().clone()
    }

    /// True when an editor is signed in.
    pub fn is_editor(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the next sign-in/sign-out transition.
    /// Returns Err once the publisher has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_signed_out() {
        let (_publisher, signal) = session_channel();
        assert!(!signal.is_editor());
        assert!(signal.current().is_none());
    }

    #[test]
    fn test_sign_in_then_out() {
        let (publisher, signal) = session_channel();
        publisher.sign_in(EditorUser {
            uid: "u1".into(),
            email: Some("u1@example.com".into()),
        });
        assert!(signal.is_editor());
        assert_eq!(signal.current().unwrap().uid, "u1");

        publisher.sign_out();
        assert!(!signal.is_editor());
    }

    #[tokio::test]
    async fn test_changed_observes_transition() {
        let (publisher, mut signal) = session_channel();
        publisher.sign_in(EditorUser {
            uid: "u2".into(),
            email: None,
        });
        signal.changed().await.unwrap();
        assert!(signal.is_editor());
    }
}
