// ── Connection configuration model ──
//
// A `ConnectionConfig` is a plain value: the editor mutates a working
// copy, snapshots it when a test or save is requested, and the rest of
// the core only ever sees immutable copies. Validation is local and
// I/O-free so "malformed" and "unreachable" stay distinguishable —
// reachability is the session manager's verdict, not validation's.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Local validation failures, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("connection name must not be empty")]
    EmptyName,

    #[error("invalid endpoint URL: {reason}")]
    InvalidEndpoint { reason: String },
}

/// Connection parameters for one named OPC UA endpoint.
///
/// `username`, `password`, `use_transport_security`, and `namespace` are
/// reserved extension fields: left at their defaults, behavior is
/// identical to the anonymous/no-security path. Name uniqueness is the
/// hosting registry's concern, not this type's.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Display identifier; must be non-empty at save/test time.
    pub name: String,
    /// Endpoint URL, e.g. `opc.tcp://host:4840/path`. May carry
    /// unresolved `${VAR}` / `%%VAR%%` tokens before resolution.
    pub endpoint_url: String,
    /// Reserved: username for a credentialed identity.
    pub username: Option<String>,
    /// Reserved: password for a credentialed identity.
    pub password: Option<SecretString>,
    /// Reserved: request a signed/encrypted channel.
    pub use_transport_security: bool,
    /// Reserved: default namespace for address-space operations.
    pub namespace: Option<String>,
}

impl PartialEq for ConnectionConfig {
    // SecretString has no PartialEq; compare exposed secrets here so the
    // idempotence tests can compare whole configs.
    fn eq(&self, other: &Self) -> bool {
        let secrets_equal = match (&self.password, &other.password) {
            (None, None) => true,
            (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
            _ => false,
        };
        self.name == other.name
            && self.endpoint_url == other.endpoint_url
            && self.username == other.username
            && self.use_transport_security == other.use_transport_security
            && self.namespace == other.namespace
            && secrets_equal
    }
}

impl ConnectionConfig {
    pub fn new(name: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Validate name and endpoint shape. No DNS, no connectivity.
    ///
    /// Endpoint strings still carrying substitution tokens get a lenient
    /// pass — they cannot parse until the host resolves them; the editor
    /// re-validates strictly after resolution.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_endpoint_shape(&self.endpoint_url, true)
    }

    /// Apply the host-supplied token resolver to every string field,
    /// producing a new, resolved value. Pure and side-effect free;
    /// idempotent whenever the resolver is a fixpoint on resolved text.
    pub fn resolve_variables<R>(&self, resolver: R) -> ResolvedConfig
    where
        R: Fn(&str) -> String,
    {
        ResolvedConfig(Self {
            name: resolver(&self.name),
            endpoint_url: resolver(&self.endpoint_url),
            username: self.username.as_deref().map(&resolver),
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::from(resolver(p.expose_secret()))),
            use_transport_security: self.use_transport_security,
            namespace: self.namespace.as_deref().map(&resolver),
        })
    }
}

/// A [`ConnectionConfig`] whose string fields have been through variable
/// resolution. Produced by [`ConnectionConfig::resolve_variables`];
/// consumed by the session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig(ConnectionConfig);

impl ResolvedConfig {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn endpoint_url(&self) -> &str {
        &self.0.endpoint_url
    }

    pub fn username(&self) -> Option<&str> {
        self.0.username.as_deref()
    }

    /// Strict endpoint check — placeholders get no leniency once
    /// resolution has run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_endpoint_shape(&self.0.endpoint_url, false)
    }

    /// Resolving an already-resolved config is a no-op for a fixpoint
    /// resolver.
    pub fn resolve_variables<R>(&self, resolver: R) -> Self
    where
        R: Fn(&str) -> String,
    {
        self.0.resolve_variables(resolver)
    }

    pub fn as_config(&self) -> &ConnectionConfig {
        &self.0
    }
}

fn contains_placeholder(s: &str) -> bool {
    s.contains("${") || s.contains("%%")
}

fn validate_endpoint_shape(endpoint: &str, allow_placeholders: bool) -> Result<(), ValidationError> {
    if endpoint.trim().is_empty() {
        return Err(ValidationError::InvalidEndpoint {
            reason: "endpoint URL is empty".into(),
        });
    }
    if contains_placeholder(endpoint) {
        // Pre-resolution the tokens cannot be parsed, so they pass; a
        // token surviving resolution is malformed input, not a URL the
        // url crate should get to interpret as an opaque host.
        if allow_placeholders {
            return Ok(());
        }
        return Err(ValidationError::InvalidEndpoint {
            reason: format!("unresolved substitution token in '{endpoint}'"),
        });
    }
    let url = Url::parse(endpoint).map_err(|e| ValidationError::InvalidEndpoint {
        reason: e.to_string(),
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::InvalidEndpoint {
            reason: format!("missing host component in '{endpoint}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plc(name: &str, url: &str) -> ConnectionConfig {
        ConnectionConfig::new(name, url)
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(plc("PLC1", "opc.tcp://10.0.0.5:4840").validate(), Ok(()));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(
            plc("", "opc.tcp://10.0.0.5:4840").validate(),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            plc("   ", "opc.tcp://10.0.0.5:4840").validate(),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        assert!(matches!(
            plc("PLC2", "").validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn schemeless_endpoint_is_rejected() {
        // "10.0.0.5:4840" has no valid scheme; "host:4840" parses with
        // scheme "host" but no host component. Both must fail.
        assert!(matches!(
            plc("PLC", "10.0.0.5:4840").validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            plc("PLC", "host:4840").validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn placeholder_endpoint_passes_lenient_validation_only() {
        // The url crate happily parses "${OPC_HOST}" as an opaque host
        // for a non-special scheme, so the strict check must reject the
        // token itself, not rely on a parse failure.
        let cfg = plc("PLC", "opc.tcp://${OPC_HOST}:4840");
        assert_eq!(cfg.validate(), Ok(()));

        let resolved = cfg.resolve_variables(|s| s.to_string());
        match resolved.validate() {
            Err(ValidationError::InvalidEndpoint { reason }) => {
                assert!(reason.contains("unresolved"), "got reason: {reason}");
            }
            other => panic!("unresolved token survived strict validation: {other:?}"),
        }
    }

    #[test]
    fn percent_delimited_tokens_are_also_caught_after_resolution() {
        let cfg = plc("PLC", "opc.tcp://%%OPC_HOST%%:4840");
        assert_eq!(cfg.validate(), Ok(()));

        let resolved = cfg.resolve_variables(|s| s.to_string());
        assert!(matches!(
            resolved.validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn resolve_substitutes_every_string_field() {
        let mut cfg = plc("${NAME}", "opc.tcp://${HOST}:4840");
        cfg.username = Some("${USER}".into());
        cfg.namespace = Some("ns=${NS}".into());

        let resolved = cfg.resolve_variables(|s| {
            s.replace("${NAME}", "PLC1")
                .replace("${HOST}", "10.0.0.5")
                .replace("${USER}", "operator")
                .replace("${NS}", "2")
        });

        assert_eq!(resolved.name(), "PLC1");
        assert_eq!(resolved.endpoint_url(), "opc.tcp://10.0.0.5:4840");
        assert_eq!(resolved.username(), Some("operator"));
        assert_eq!(resolved.as_config().namespace.as_deref(), Some("ns=2"));
        assert_eq!(resolved.validate(), Ok(()));
    }

    #[test]
    fn resolve_is_idempotent() {
        let resolver = |s: &str| s.replace("${HOST}", "10.0.0.5");
        let cfg = plc("PLC1", "opc.tcp://${HOST}:4840");

        let once = cfg.resolve_variables(resolver);
        let twice = once.resolve_variables(resolver);
        assert_eq!(once, twice);
    }
}
