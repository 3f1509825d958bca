// ualink-core: the testable heart of an OPC UA connection editor.
//
// Validated connection configuration, explicit security/identity
// selection, and a bounded connect/verify/disconnect cycle that reports
// a classified result. No presentation code lives here — the editor
// contract in `editor` is the boundary a GUI or host engine talks to.

pub mod config;
pub mod editor;
pub mod security;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConnectionConfig, ResolvedConfig, ValidationError};
pub use editor::{ConnectionEditor, VariableResolver, identity_resolver};
pub use security::{
    IdentityKind, IdentityProvider, IdentitySelection, SecurityError, SecuritySelection,
    build_identity_provider,
};
pub use session::{DEFAULT_TEST_TIMEOUT, FailureKind, SessionResult, SessionTester};

// The wire-level policy enum is shared with the transport layer.
pub use ualink_transport::SecurityPolicy;
