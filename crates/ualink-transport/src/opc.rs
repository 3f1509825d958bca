// Real OPC UA adapter over the `opcua` crate.
//
// The `opcua` client is synchronous; each open/close runs on the
// blocking pool so async callers stay responsive. One adapter call maps
// to exactly one connect attempt — retry policy belongs to the caller.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use opcua::client::prelude as ua;

use crate::error::Error;
use crate::session::{IdentityToken, SecurityPolicy, SessionHandle, SessionTransport};

/// [`SessionTransport`] backed by the `opcua` crate's client stack.
pub struct OpcUaTransport {
    application_name: String,
    application_uri: String,
}

impl OpcUaTransport {
    pub fn new(application_name: impl Into<String>, application_uri: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_uri: application_uri.into(),
        }
    }
}

impl Default for OpcUaTransport {
    fn default() -> Self {
        Self::new("ualink", "urn:ualink:client")
    }
}

#[async_trait]
impl SessionTransport for OpcUaTransport {
    async fn open(
        &self,
        endpoint: &str,
        policy: SecurityPolicy,
        identity: &IdentityToken,
    ) -> Result<Box<dyn SessionHandle>, Error> {
        let endpoint = endpoint.to_string();
        let identity = identity.clone();
        let app_name = self.application_name.clone();
        let app_uri = self.application_uri.clone();

        debug!(%endpoint, %policy, identity = identity.kind(), "opening OPC UA session");

        let session = tokio::task::spawn_blocking(move || {
            open_blocking(&endpoint, policy, &identity, &app_name, &app_uri)
        })
        .await
        .map_err(|e| Error::Other(format!("blocking connect task failed: {e}")))??;

        Ok(Box::new(session))
    }
}

fn open_blocking(
    endpoint: &str,
    policy: SecurityPolicy,
    identity: &IdentityToken,
    app_name: &str,
    app_uri: &str,
) -> Result<OpcUaSession, Error> {
    let mut client = ua::ClientBuilder::new()
        .application_name(app_name)
        .application_uri(app_uri)
        .trust_server_certs(true)
        .create_sample_keypair(true)
        .session_retry_limit(1)
        .client()
        .ok_or_else(|| Error::Other("OPC UA client configuration rejected".into()))?;

    let mode = match policy {
        SecurityPolicy::None => ua::MessageSecurityMode::None,
        SecurityPolicy::Basic256Sha256 => ua::MessageSecurityMode::SignAndEncrypt,
    };
    let description: ua::EndpointDescription =
        (endpoint, policy.to_string().as_str(), mode).into();

    let token = match identity {
        IdentityToken::Anonymous => ua::IdentityToken::Anonymous,
        IdentityToken::UserName { username, password } => {
            ua::IdentityToken::UserName(username.clone(), password.expose_secret().to_string())
        }
    };

    let session = client
        .connect_to_endpoint(description, token)
        .map_err(|status| classify_status(status, endpoint))?;

    Ok(OpcUaSession {
        endpoint: endpoint.to_string(),
        session: Some(session),
    })
}

/// Map an OPC UA status code onto the transport taxonomy.
fn classify_status(status: ua::StatusCode, endpoint: &str) -> Error {
    if status == ua::StatusCode::BadSecurityPolicyRejected
        || status == ua::StatusCode::BadSecurityModeRejected
        || status == ua::StatusCode::BadSecurityChecksFailed
    {
        Error::SecurityNegotiation {
            message: format!("{endpoint}: {status}"),
        }
    } else if status == ua::StatusCode::BadIdentityTokenInvalid
        || status == ua::StatusCode::BadIdentityTokenRejected
        || status == ua::StatusCode::BadUserAccessDenied
    {
        Error::IdentityRejected {
            message: format!("{endpoint}: {status}"),
        }
    } else if status == ua::StatusCode::BadTimeout
        || status == ua::StatusCode::BadRequestTimeout
    {
        Error::Timeout { timeout_secs: 0 }
    } else if status == ua::StatusCode::BadConnectionRejected
        || status == ua::StatusCode::BadNotConnected
        || status == ua::StatusCode::BadServerHalted
        || status == ua::StatusCode::BadCommunicationError
    {
        Error::Unreachable {
            message: format!("{endpoint}: {status}"),
        }
    } else if status == ua::StatusCode::BadTcpEndpointUrlInvalid {
        Error::Other(format!("endpoint URL rejected by server: {endpoint}"))
    } else {
        Error::Rejected {
            message: format!("handshake with {endpoint} failed"),
            status: Some(status.to_string()),
        }
    }
}

struct OpcUaSession {
    endpoint: String,
    session: Option<std::sync::Arc<opcua::sync::RwLock<ua::Session>>>,
}

#[async_trait]
impl SessionHandle for OpcUaSession {
    async fn close(mut self: Box<Self>) -> Result<(), Error> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let endpoint = self.endpoint.clone();
        tokio::task::spawn_blocking(move || {
            session.read().disconnect();
            debug!(%endpoint, "OPC UA session disconnected");
        })
        .await
        .map_err(|e| Error::Other(format!("blocking disconnect task failed: {e}")))?;
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
