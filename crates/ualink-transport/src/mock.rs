// Scriptable in-memory transport for tests.
//
// Real endpoint tests need a live server; everything else in this
// workspace tests against `MockTransport`. Outcomes are scripted per
// endpoint URL, and two counters make the interesting assertions cheap:
// `open_attempts` proves whether the network layer was touched at all,
// and `live_sessions` proves nothing was leaked (close decrements it;
// a handle that is dropped without being closed stays counted).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::session::{IdentityToken, SecurityPolicy, SessionHandle, SessionTransport};

/// What the mock should do when a given endpoint is opened.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Handshake succeeds; close succeeds.
    Accept,
    /// Handshake succeeds; close fails with the given message.
    AcceptWithFailingClose { message: String },
    /// Handshake fails with the given transport error.
    Fail(Error),
    /// Never completes — for exercising caller-side timeouts. The open
    /// future parks forever; cancellation (drop) leaves no live session.
    Hang,
    /// Sleep, then accept. Pairs with paused tokio time.
    DelayThenAccept(Duration),
}

/// Scriptable [`SessionTransport`] used throughout the test suites.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, MockOutcome>>,
    open_attempts: AtomicUsize,
    live_sessions: Arc<AtomicUsize>,
}

impl MockTransport {
    /// A mock that accepts every endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for one endpoint URL. Unscripted endpoints
    /// accept.
    pub fn script(&self, endpoint: impl Into<String>, outcome: MockOutcome) {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(endpoint.into(), outcome);
    }

    /// Builder-style variant of [`script`](Self::script).
    pub fn with_script(self, endpoint: impl Into<String>, outcome: MockOutcome) -> Self {
        self.script(endpoint, outcome);
        self
    }

    /// Number of `open` calls observed, successful or not.
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions currently open (opened and not yet closed).
    /// Zero after a test proves deterministic release.
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn open(
        &self,
        endpoint: &str,
        _policy: SecurityPolicy,
        _identity: &IdentityToken,
    ) -> Result<Box<dyn SessionHandle>, Error> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(%endpoint, "mock open");

        let outcome = {
            let scripts = self
                .scripts
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            scripts.get(endpoint).cloned().unwrap_or(MockOutcome::Accept)
        };

        let close_error = match outcome {
            MockOutcome::Accept => None,
            MockOutcome::AcceptWithFailingClose { message } => Some(Error::Other(message)),
            MockOutcome::Fail(err) => return Err(err),
            MockOutcome::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
            MockOutcome::DelayThenAccept(delay) => {
                tokio::time::sleep(delay).await;
                None
            }
        };

        self.live_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            endpoint: endpoint.to_string(),
            live: Arc::clone(&self.live_sessions),
            close_error,
        }))
    }
}

struct MockSession {
    endpoint: String,
    live: Arc<AtomicUsize>,
    close_error: Option<Error>,
}

#[async_trait]
impl SessionHandle for MockSession {
    async fn close(self: Box<Self>) -> Result<(), Error> {
        // The session is released even when close reports an error.
        self.live.fetch_sub(1, Ordering::SeqCst);
        match self.close_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
