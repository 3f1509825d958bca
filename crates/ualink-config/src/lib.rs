//! Persisted connection registry for ualink hosts.
//!
//! TOML-backed named connections, credential resolution (env var +
//! keyring + plaintext), and translation to `ualink_core` types. The
//! core never reads files — hosts load a [`Registry`] here and hand
//! resolved values in.
//!
//! The on-disk shape is forward-compatible: every field beyond `name`
//! and `endpoint_url` is optional and defaults to the anonymous,
//! no-security behavior, so files written by older versions keep
//! loading unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ualink_core::{
    ConnectionConfig, IdentitySelection, SecurityPolicy, SecuritySelection,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize registry: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("registry loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML registry structs ───────────────────────────────────────────

/// Top-level registry document: defaults plus named connections.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Registry {
    /// Global defaults applied to every connection.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named connection entries, keyed by display name.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Session-test timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

impl Defaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One persisted connection.
///
/// Only `endpoint_url` is required; the rest are the reserved extension
/// fields, absent in files written before they existed.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ConnectionEntry {
    /// Endpoint URL, possibly with unresolved `${VAR}` tokens.
    pub endpoint_url: String,

    /// Username for a credentialed identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext password — prefer `password_env` or the keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Security policy name ("none", "basic256sha256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<String>,

    /// Shorthand for requesting a signed-and-encrypted channel when no
    /// explicit policy is given.
    #[serde(default)]
    pub use_transport_security: bool,

    /// Default namespace for address-space operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// ── Registry file path ──────────────────────────────────────────────

/// Resolve the registry file path via XDG / platform conventions.
pub fn registry_path() -> PathBuf {
    ProjectDirs::from("io", "ualink", "ualink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("connections.toml");
            p
        },
        |dirs| dirs.config_dir().join("connections.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ualink");
    p
}

// ── Registry loading / saving ───────────────────────────────────────

/// Load the registry from a specific file plus `UALINK_`-prefixed
/// environment overrides.
pub fn load_registry_from(path: &Path) -> Result<Registry, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Registry::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UALINK_").split("__"));

    let registry: Registry = figment.extract()?;
    Ok(registry)
}

/// Load the registry from the canonical path.
pub fn load_registry() -> Result<Registry, ConfigError> {
    load_registry_from(&registry_path())
}

/// Serialize the registry to TOML and write it to `path`.
pub fn save_registry_to(path: &Path, registry: &Registry) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(registry)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Save the registry to the canonical path.
pub fn save_registry(registry: &Registry) -> Result<(), ConfigError> {
    save_registry_to(&registry_path(), registry)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a connection's password through the credential chain:
/// entry's `password_env` env var, then the system keyring, then the
/// plaintext field. `None` means no credential is configured — for
/// anonymous connections that is the normal case, not an error.
pub fn resolve_password(entry: &ConnectionEntry, name: &str) -> Option<SecretString> {
    // 1. Entry's password_env → env var lookup
    if let Some(ref env_name) = entry.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(keyring_entry) = keyring::Entry::new("ualink", &format!("{name}/password")) {
        if let Ok(secret) = keyring_entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in the registry file
    entry
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

// ── Bridges to core types ───────────────────────────────────────────

/// Build a core [`ConnectionConfig`] from a persisted entry.
pub fn entry_to_config(name: &str, entry: &ConnectionEntry) -> ConnectionConfig {
    let mut config = ConnectionConfig::new(name, &entry.endpoint_url);
    config.username = entry.username.clone();
    config.password = resolve_password(entry, name);
    config.use_transport_security = entry.use_transport_security;
    config.namespace = entry.namespace.clone();
    config
}

/// Derive the [`SecuritySelection`] a persisted entry implies.
///
/// No username means anonymous. No explicit policy means `None`, unless
/// `use_transport_security` requests the signed-and-encrypted default.
pub fn entry_to_selection(
    name: &str,
    entry: &ConnectionEntry,
) -> Result<SecuritySelection, ConfigError> {
    let policy = match entry.security_policy.as_deref() {
        Some(raw) => raw
            .parse::<SecurityPolicy>()
            .map_err(|_| ConfigError::Validation {
                field: "security_policy".into(),
                reason: format!("unknown policy '{raw}' for connection '{name}'"),
            })?,
        None if entry.use_transport_security => SecurityPolicy::Basic256Sha256,
        None => SecurityPolicy::None,
    };

    let identity = match entry.username {
        Some(ref username) => IdentitySelection::UsernamePassword {
            username: username.clone(),
            password: resolve_password(entry, name),
        },
        None => IdentitySelection::Anonymous,
    };

    Ok(SecuritySelection { policy, identity })
}
