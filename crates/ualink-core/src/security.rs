// ── Identity & security negotiation ──
//
// A `SecuritySelection` pairs a message security policy with an identity
// selection. The pairing table is explicit — new policies or identities
// extend the table, they are never inferred. Provider construction is
// pure and fails fast: a bad pairing or a missing secret never reaches
// the network layer.

use secrecy::SecretString;
use thiserror::Error;

use ualink_transport::{IdentityToken, SecurityPolicy};

/// Configuration-logic failures, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("security policy {policy} does not accept {identity} identities")]
    IncompatiblePairing {
        policy: SecurityPolicy,
        identity: IdentityKind,
    },

    #[error("unsupported identity: {reason}")]
    UnsupportedIdentity { reason: String },
}

/// How the client will identify itself, as chosen by the user.
///
/// Carries credential *data* where the transport's `IdentityToken`
/// carries the resolved wire capability. A selection may be incomplete
/// (missing password); a token never is.
#[derive(Debug, Clone)]
pub enum IdentitySelection {
    /// No identity asserted.
    Anonymous,
    /// Username/password identity. A `None` password is representable so
    /// that "secret not configured" fails fast at construction, not at
    /// the server.
    UsernamePassword {
        username: String,
        password: Option<SecretString>,
    },
}

/// Discriminant of [`IdentitySelection`], used in the pairing table and
/// in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IdentityKind {
    Anonymous,
    UsernamePassword,
}

impl IdentitySelection {
    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::Anonymous => IdentityKind::Anonymous,
            Self::UsernamePassword { .. } => IdentityKind::UsernamePassword,
        }
    }
}

/// A {policy, identity} pair selected independently of transport.
#[derive(Debug, Clone)]
pub struct SecuritySelection {
    pub policy: SecurityPolicy,
    pub identity: IdentitySelection,
}

impl SecuritySelection {
    /// The no-security, anonymous pairing — today's default path.
    pub fn anonymous() -> Self {
        Self {
            policy: SecurityPolicy::None,
            identity: IdentitySelection::Anonymous,
        }
    }

    /// Username/password over a signed-and-encrypted channel.
    pub fn credentialed(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            policy: SecurityPolicy::Basic256Sha256,
            identity: IdentitySelection::UsernamePassword {
                username: username.into(),
                password: Some(password),
            },
        }
    }

    /// Whether this pairing appears in the compatibility table.
    pub fn is_compatible(&self) -> bool {
        compatible_identities(self.policy).contains(&self.identity.kind())
    }
}

impl Default for SecuritySelection {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// The explicit policy/identity compatibility table.
///
/// Every policy must map to at least one identity kind. `None` refuses
/// username tokens: a password on an unsecured channel would cross the
/// wire in cleartext, so the pairing is rejected locally instead of
/// letting the server decide.
pub fn compatible_identities(policy: SecurityPolicy) -> &'static [IdentityKind] {
    match policy {
        SecurityPolicy::None => &[IdentityKind::Anonymous],
        SecurityPolicy::Basic256Sha256 => {
            &[IdentityKind::Anonymous, IdentityKind::UsernamePassword]
        }
    }
}

/// Ready-to-use authentication capability for one session attempt.
///
/// Construction has already verified pairing compatibility and credential
/// presence; the transport just encodes the token.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    token: IdentityToken,
}

impl IdentityProvider {
    pub fn token(&self) -> &IdentityToken {
        &self.token
    }
}

/// Build the identity capability for a selection, checking the pairing
/// table first. Pure construction — no network, no UI.
pub fn build_identity_provider(
    selection: &SecuritySelection,
) -> Result<IdentityProvider, SecurityError> {
    if !selection.is_compatible() {
        return Err(SecurityError::IncompatiblePairing {
            policy: selection.policy,
            identity: selection.identity.kind(),
        });
    }

    let token = match &selection.identity {
        IdentitySelection::Anonymous => IdentityToken::Anonymous,
        IdentitySelection::UsernamePassword { username, password } => {
            if username.trim().is_empty() {
                return Err(SecurityError::UnsupportedIdentity {
                    reason: "username is empty".into(),
                });
            }
            let Some(password) = password else {
                return Err(SecurityError::UnsupportedIdentity {
                    reason: format!("no password configured for user '{username}'"),
                });
            };
            IdentityToken::UserName {
                username: username.clone(),
                password: password.clone(),
            }
        }
    };

    Ok(IdentityProvider { token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_policy_has_a_compatible_identity() {
        for policy in [SecurityPolicy::None, SecurityPolicy::Basic256Sha256] {
            assert!(
                !compatible_identities(policy).is_empty(),
                "policy {policy} has no compatible identity"
            );
        }
    }

    #[test]
    fn anonymous_selection_builds_a_provider() {
        let provider = build_identity_provider(&SecuritySelection::anonymous())
            .expect("anonymous/no-security always builds");
        assert!(matches!(provider.token(), IdentityToken::Anonymous));
    }

    #[test]
    fn cleartext_password_pairing_is_incompatible() {
        let selection = SecuritySelection {
            policy: SecurityPolicy::None,
            identity: IdentitySelection::UsernamePassword {
                username: "operator".into(),
                password: Some(SecretString::from("s3cret".to_string())),
            },
        };
        let err = build_identity_provider(&selection).expect_err("pairing not in the table");
        assert_eq!(
            err,
            SecurityError::IncompatiblePairing {
                policy: SecurityPolicy::None,
                identity: IdentityKind::UsernamePassword,
            }
        );
    }

    #[test]
    fn missing_password_fails_fast() {
        let selection = SecuritySelection {
            policy: SecurityPolicy::Basic256Sha256,
            identity: IdentitySelection::UsernamePassword {
                username: "operator".into(),
                password: None,
            },
        };
        assert!(matches!(
            build_identity_provider(&selection),
            Err(SecurityError::UnsupportedIdentity { .. })
        ));
    }

    #[test]
    fn blank_username_fails_fast() {
        let selection = SecuritySelection {
            policy: SecurityPolicy::Basic256Sha256,
            identity: IdentitySelection::UsernamePassword {
                username: "  ".into(),
                password: Some(SecretString::from("s3cret".to_string())),
            },
        };
        assert!(matches!(
            build_identity_provider(&selection),
            Err(SecurityError::UnsupportedIdentity { .. })
        ));
    }

    #[test]
    fn credentialed_selection_builds_a_username_token() {
        let selection =
            SecuritySelection::credentialed("operator", SecretString::from("s3cret".to_string()));
        let provider = build_identity_provider(&selection).expect("complete credentials build");
        assert!(matches!(provider.token(), IdentityToken::UserName { .. }));
    }
}
