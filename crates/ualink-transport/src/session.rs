// Session capability traits and wire-level security types.
//
// A protocol stack plugs into ualink by implementing `SessionTransport`:
// open a session against an endpoint URL, hand back a `SessionHandle`,
// close it on request. Anything conforming can be substituted — the
// in-repo mock, the OPC UA adapter, or a host-supplied stack.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

// ── Security policy ─────────────────────────────────────────────────

/// Message security policy requested for a session.
///
/// Closed enumeration: `None` performs no signing or encryption. Signed
/// and encrypted variants are additive — new policies extend this enum
/// and the compatibility table in `ualink-core`, never call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SecurityPolicy {
    /// No signing, no encryption.
    #[default]
    None,
    /// Sign-and-encrypt with the Basic256Sha256 suite.
    Basic256Sha256,
}

impl SecurityPolicy {
    /// The OPC UA policy URI for this policy.
    pub fn uri(self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
        }
    }

    /// Returns `true` for the unsecured policy.
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

// ── Identity token ──────────────────────────────────────────────────

/// Wire-level identity the client asserts to the server.
///
/// This is the *resolved* capability handed to a transport — credential
/// presence has already been checked by `ualink-core`'s provider
/// construction. A transport only encodes it.
#[derive(Clone)]
pub enum IdentityToken {
    /// No identity; accepted by servers allowing anonymous sessions.
    Anonymous,
    /// Username/password token.
    UserName {
        username: String,
        password: SecretString,
    },
}

impl IdentityToken {
    /// Short label for logging — never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::UserName { .. } => "username",
        }
    }
}

impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("IdentityToken::Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("IdentityToken::UserName")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

// ── Capability traits ───────────────────────────────────────────────

/// A live protocol session, owned exclusively by its opener.
///
/// Closing consumes the handle: once `close` returns there is nothing
/// left to release, whatever the result.
#[async_trait]
pub trait SessionHandle: Send {
    /// Release the session. Errors are reportable but the session is
    /// gone either way.
    async fn close(self: Box<Self>) -> Result<(), Error>;

    /// The endpoint URL this session was opened against.
    fn endpoint(&self) -> &str;
}

/// The capability a session test needs from a protocol stack.
///
/// Implementations must not leak resources on the failure path: an
/// `Err` from `open` means nothing remains to release. They must also
/// tolerate being cancelled mid-open (the caller enforces its timeout
/// by dropping the future).
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Open a session against `endpoint` with the given security policy
    /// and identity, performing the full protocol handshake.
    async fn open(
        &self,
        endpoint: &str,
        policy: SecurityPolicy,
        identity: &IdentityToken,
    ) -> Result<Box<dyn SessionHandle>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("none".parse::<SecurityPolicy>(), Ok(SecurityPolicy::None));
        assert_eq!(
            "basic256sha256".parse::<SecurityPolicy>(),
            Ok(SecurityPolicy::Basic256Sha256)
        );
        assert!("Basic128".parse::<SecurityPolicy>().is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let token = IdentityToken::UserName {
            username: "operator".into(),
            password: SecretString::from("hunter2".to_string()),
        };
        let rendered = format!("{token:?}");
        assert!(rendered.contains("operator"));
        assert!(!rendered.contains("hunter2"));
    }
}
