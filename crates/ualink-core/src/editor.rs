// ── Configuration editor contract ──
//
// The boundary a presentation layer talks to: read/write the working
// configuration, request a save (validation + snapshot), request a test
// (validate → resolve → build identity → bounded session test). No
// layout, focus, or dialog chrome belongs here; the host renders the
// fields and surfaces the returned results.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use crate::config::{ConnectionConfig, ValidationError};
use crate::security::{SecuritySelection, build_identity_provider};
use crate::session::{SessionResult, SessionTester};

/// Host-supplied token substitution, e.g. the variable space of an ETL
/// engine. Must be pure; the core calls it once per string field.
pub type VariableResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Returns input unchanged — for hosts without variable substitution.
pub fn identity_resolver() -> VariableResolver {
    Arc::new(str::to_string)
}

/// Owns the working copy of a [`ConnectionConfig`] while an edit is in
/// progress.
///
/// The working copy is mutated in place through the field accessors and
/// snapshotted the moment a test or save is requested, so an in-flight
/// test never observes later edits. Cancelling an edit is simply
/// dropping the editor.
pub struct ConnectionEditor {
    config: ConnectionConfig,
    resolver: VariableResolver,
    tester: SessionTester,
}

impl ConnectionEditor {
    pub fn new(config: ConnectionConfig, resolver: VariableResolver, tester: SessionTester) -> Self {
        Self {
            config,
            resolver,
            tester,
        }
    }

    /// Start editing a blank configuration.
    pub fn blank(resolver: VariableResolver, tester: SessionTester) -> Self {
        Self::new(ConnectionConfig::default(), resolver, tester)
    }

    // ── Field access ─────────────────────────────────────────────────

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.config.name = name.into();
    }

    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    pub fn set_endpoint_url(&mut self, url: impl Into<String>) {
        self.config.endpoint_url = url.into();
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.config.username = username;
    }

    pub fn set_password(&mut self, password: Option<SecretString>) {
        self.config.password = password;
    }

    pub fn set_use_transport_security(&mut self, enabled: bool) {
        self.config.use_transport_security = enabled;
    }

    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.config.namespace = namespace;
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Validate the working copy and hand back an accepted snapshot for
    /// the hosting registry to persist. The working copy stays editable.
    pub fn request_save(&self) -> Result<ConnectionConfig, ValidationError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }

    /// Run one bounded session test with the given security selection.
    ///
    /// Local failures — validation, pairing, missing credentials — come
    /// back as [`SessionResult::Failure`] without any transport call, so
    /// the presentation layer has a single result shape to surface.
    /// Async and free of shared mutable state: hosts spawn this on any
    /// worker to keep their presentation thread responsive.
    pub async fn request_test(
        &self,
        selection: &SecuritySelection,
        timeout: Option<Duration>,
    ) -> SessionResult {
        let snapshot = self.config.clone();

        if let Err(err) = snapshot.validate() {
            debug!(error = %err, "test rejected by validation");
            return SessionResult::from_validation(&err);
        }

        let provider = match build_identity_provider(selection) {
            Ok(provider) => provider,
            Err(err) => {
                debug!(error = %err, "test rejected by security negotiation");
                return SessionResult::from_security(&err);
            }
        };

        let resolved = snapshot.resolve_variables(self.resolver.as_ref());

        // Placeholders are expanded now; re-check the endpoint strictly
        // so a malformed resolution is reported as such, not as a
        // transport failure.
        if let Err(err) = resolved.validate() {
            debug!(error = %err, "resolved config rejected by validation");
            return SessionResult::from_validation(&err);
        }

        self.tester
            .test_connection(&resolved, &provider, selection.policy, timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FailureKind;
    use ualink_transport::SessionTransport;
    use ualink_transport::mock::MockTransport;

    fn editor_with(transport: &Arc<MockTransport>) -> ConnectionEditor {
        let tester = SessionTester::new(Arc::clone(transport) as Arc<dyn SessionTransport>);
        ConnectionEditor::blank(identity_resolver(), tester)
    }

    #[tokio::test]
    async fn empty_name_halts_before_any_transport_call() {
        let transport = Arc::new(MockTransport::new());
        let mut editor = editor_with(&transport);
        editor.set_endpoint_url("opc.tcp://10.0.0.5:4840");

        let result = editor
            .request_test(&SecuritySelection::anonymous(), None)
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::EmptyName));
        assert_eq!(transport.open_attempts(), 0, "no connection attempt made");
    }

    #[tokio::test]
    async fn incompatible_pairing_halts_before_any_transport_call() {
        let transport = Arc::new(MockTransport::new());
        let mut editor = editor_with(&transport);
        editor.set_name("PLC1");
        editor.set_endpoint_url("opc.tcp://10.0.0.5:4840");

        let selection = SecuritySelection {
            policy: crate::SecurityPolicy::None,
            identity: crate::IdentitySelection::UsernamePassword {
                username: "operator".into(),
                password: Some(SecretString::from("s3cret".to_string())),
            },
        };
        let result = editor.request_test(&selection, None).await;

        assert_eq!(
            result.failure_kind(),
            Some(FailureKind::IncompatibleSecurityPairing)
        );
        assert_eq!(transport.open_attempts(), 0);
    }

    #[test]
    fn save_returns_a_validated_snapshot() {
        let transport = Arc::new(MockTransport::new());
        let mut editor = editor_with(&transport);
        editor.set_name("PLC1");
        editor.set_endpoint_url("opc.tcp://10.0.0.5:4840");

        let saved = editor.request_save().expect("valid config saves");
        assert_eq!(saved.name, "PLC1");

        // Later edits must not affect the returned snapshot.
        editor.set_name("PLC2");
        assert_eq!(saved.name, "PLC1");
    }

    #[test]
    fn save_rejects_an_empty_name() {
        let transport = Arc::new(MockTransport::new());
        let editor = editor_with(&transport);
        assert_eq!(editor.request_save(), Err(ValidationError::EmptyName));
    }
}
