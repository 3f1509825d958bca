// ualink-transport: protocol session capability for ualink.
//
// Defines the substitutable capability an endpoint test needs from a
// protocol stack — open a session, close a session — plus the transport
// error taxonomy, wire-level security/identity types, a scriptable mock
// for tests, and (behind the `opcua` feature) a real OPC UA adapter.

pub mod error;
pub mod mock;
pub mod session;

#[cfg(feature = "opcua")]
pub mod opc;

pub use error::Error;
pub use session::{IdentityToken, SecurityPolicy, SessionHandle, SessionTransport};

#[cfg(feature = "opcua")]
pub use opc::OpcUaTransport;
