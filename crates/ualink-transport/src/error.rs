use thiserror::Error;

/// Transport-level error type for the `ualink-transport` crate.
///
/// Covers every failure mode of a single open/close cycle against a
/// protocol endpoint. `ualink-core` maps these into its user-facing
/// failure taxonomy; consumers of this crate never need to.
///
/// Every variant carries only clonable data so scripted test transports
/// can replay errors verbatim.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Reachability ────────────────────────────────────────────────
    /// The endpoint could not be reached (connection refused, DNS
    /// failure, no route to host).
    #[error("endpoint unreachable: {message}")]
    Unreachable { message: String },

    /// The adapter's own internal deadline expired mid-handshake.
    ///
    /// The caller-facing timeout lives in `ualink-core`; this variant
    /// exists for stacks that enforce their own request deadlines.
    #[error("connection attempt timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Handshake ───────────────────────────────────────────────────
    /// The server actively refused the session during the protocol
    /// handshake (bad nonce, resource limits, server halted, ...).
    #[error("server rejected the session: {message}")]
    Rejected {
        message: String,
        /// Protocol status code, when the stack surfaced one.
        status: Option<String>,
    },

    /// Endpoint-security negotiation failed: the server does not offer
    /// the requested security policy or mode.
    #[error("security negotiation failed: {message}")]
    SecurityNegotiation { message: String },

    /// The server rejected the presented identity token.
    #[error("identity token rejected: {message}")]
    IdentityRejected { message: String },

    // ── Local ───────────────────────────────────────────────────────
    /// The endpoint URL could not be parsed by the protocol stack.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Socket-level I/O failure, stringified (io::Error is not Clone).
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Anything the adapter could not classify.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` if retrying the same attempt later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::Io { .. }
        )
    }

    /// Returns `true` if the failure happened before any packet left the
    /// host (nothing was opened, nothing needs releasing).
    pub fn is_local(&self) -> bool {
        matches!(self, Self::InvalidUrl(_))
    }

    /// Convenience constructor for I/O failures.
    pub fn io(err: &std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_covers_reachability_and_timeouts() {
        assert!(
            Error::Unreachable {
                message: "connection refused".into()
            }
            .is_transient()
        );
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
        assert!(
            !Error::SecurityNegotiation {
                message: "policy not offered".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn invalid_url_is_local() {
        let err = Error::from("not a url".parse::<url::Url>().unwrap_err());
        assert!(err.is_local());
        assert!(!err.is_transient());
    }
}
