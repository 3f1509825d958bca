// ── Connection session manager ──
//
// One bounded attempt per call: open the session, treat a completed
// handshake as verification, close, report. Every exit path either
// confirms nothing was opened or closes what was — the attempt walks
// Idle → Connecting → Handshaking → Verified → Closing → Closed and
// cannot leave the manager any other way. No retries, no cross-call
// state; concurrent tests against different endpoints are independent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use ualink_transport::{Error as TransportError, SecurityPolicy, SessionTransport};

use crate::config::{ResolvedConfig, ValidationError};
use crate::security::{IdentityProvider, SecurityError};

/// Default bound on the open/handshake step. Overridable per call.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Result taxonomy ─────────────────────────────────────────────────

/// Classified failure kinds, ordered roughly by where they are detected:
/// local validation, configuration logic, then runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    EmptyName,
    InvalidEndpoint,
    IncompatibleSecurityPairing,
    UnsupportedIdentity,
    NetworkUnreachable,
    Timeout,
    ProtocolRejected,
    SecurityNegotiationFailed,
    Unknown,
}

impl FailureKind {
    /// `true` when the user can recover by correcting their input,
    /// without any server-side change.
    pub fn is_input_error(self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::InvalidEndpoint
                | Self::IncompatibleSecurityPairing
                | Self::UnsupportedIdentity
        )
    }
}

/// Outcome of one test invocation. Transient — produced, surfaced to the
/// caller, discarded.
#[derive(Debug, Clone)]
pub enum SessionResult {
    /// Session established and torn down. A close error is auxiliary:
    /// it is attached here but never demotes the success.
    Success { close_warning: Option<String> },
    /// The attempt failed; `kind` supports differentiated UI treatment,
    /// `message` is the human-readable account, `cause` the underlying
    /// transport error when one exists.
    Failure {
        kind: FailureKind,
        message: String,
        cause: Option<TransportError>,
    },
}

impl SessionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub(crate) fn from_validation(err: &ValidationError) -> Self {
        let kind = match err {
            ValidationError::EmptyName => FailureKind::EmptyName,
            ValidationError::InvalidEndpoint { .. } => FailureKind::InvalidEndpoint,
        };
        Self::Failure {
            kind,
            message: err.to_string(),
            cause: None,
        }
    }

    pub(crate) fn from_security(err: &SecurityError) -> Self {
        let kind = match err {
            SecurityError::IncompatiblePairing { .. } => FailureKind::IncompatibleSecurityPairing,
            SecurityError::UnsupportedIdentity { .. } => FailureKind::UnsupportedIdentity,
        };
        Self::Failure {
            kind,
            message: err.to_string(),
            cause: None,
        }
    }
}

/// Classification of runtime transport errors.
fn classify(err: &TransportError) -> FailureKind {
    match err {
        TransportError::Unreachable { .. } | TransportError::Io { .. } => {
            FailureKind::NetworkUnreachable
        }
        TransportError::Timeout { .. } => FailureKind::Timeout,
        TransportError::Rejected { .. } => FailureKind::ProtocolRejected,
        TransportError::SecurityNegotiation { .. } | TransportError::IdentityRejected { .. } => {
            FailureKind::SecurityNegotiationFailed
        }
        TransportError::InvalidUrl(_) => FailureKind::InvalidEndpoint,
        TransportError::Other(_) => FailureKind::Unknown,
    }
}

// ── Session tester ──────────────────────────────────────────────────

/// Performs the bounded connect/verify/disconnect cycle against a
/// [`SessionTransport`].
///
/// Holds no per-call state; `&self` methods may run concurrently. The
/// transport is shared via `Arc`, so cloning a tester is cheap.
#[derive(Clone)]
pub struct SessionTester {
    transport: Arc<dyn SessionTransport>,
    default_timeout: Duration,
}

impl SessionTester {
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self {
            transport,
            default_timeout: DEFAULT_TEST_TIMEOUT,
        }
    }

    /// Override the default timeout applied when a call passes `None`.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Open a session against the resolved endpoint, verify the
    /// handshake, close, and classify the outcome.
    ///
    /// Precondition: `resolved` has passed validation. The open and
    /// handshake are bounded by `timeout` (falling back to the tester's
    /// default); on expiry the in-flight attempt is abandoned by
    /// dropping its future, never left to finish in the background.
    pub async fn test_connection(
        &self,
        resolved: &ResolvedConfig,
        provider: &IdentityProvider,
        policy: SecurityPolicy,
        timeout: Option<Duration>,
    ) -> SessionResult {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let endpoint = resolved.endpoint_url();

        debug!(name = resolved.name(), %endpoint, %policy, "connecting");

        let opened = tokio::time::timeout(
            timeout,
            self.transport.open(endpoint, policy, provider.token()),
        )
        .await;

        match opened {
            Err(_elapsed) => {
                warn!(%endpoint, timeout_secs = timeout.as_secs(), "connection attempt timed out");
                SessionResult::Failure {
                    kind: FailureKind::Timeout,
                    message: format!(
                        "no response from {endpoint} within {}s",
                        timeout.as_secs()
                    ),
                    cause: None,
                }
            }
            Ok(Err(err)) => {
                let kind = classify(&err);
                warn!(%endpoint, %kind, error = %err, "connection attempt failed");
                SessionResult::Failure {
                    kind,
                    message: format!("connecting to {endpoint} failed: {err}"),
                    cause: Some(err),
                }
            }
            Ok(Ok(handle)) => {
                debug!(%endpoint, "session verified, closing");
                match handle.close().await {
                    Ok(()) => SessionResult::Success {
                        close_warning: None,
                    },
                    Err(err) => {
                        // The test itself succeeded; a failed close is
                        // reported but must not mask that.
                        warn!(%endpoint, error = %err, "session close failed after verification");
                        SessionResult::Success {
                            close_warning: Some(err.to_string()),
                        }
                    }
                }
            }
        }
    }
}
