//! Credential shapes understood by the providers.

use std::fmt;

use earshot_core::CredentialConfig;

/// The authentication shape a provider's backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    None,
    /// Single bearer/API token
    Token,
    /// Structured credential serialized as JSON
    Json,
    /// Username and password
    Basic,
    /// Client id and client key
    KeyPair,
}

/// A resolved credential, injected into a provider at construction.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Token(String),
    Json(String),
    Basic { username: String, password: String },
    KeyPair { client_id: String, client_key: String },
}

impl Credential {
    /// Build the credential of the requested shape from raw config fields.
    ///
    /// Missing fields become empty strings; the backend rejects them.
    pub fn resolve(kind: CredentialKind, raw: &CredentialConfig) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        match kind {
            CredentialKind::None => Credential::None,
            CredentialKind::Token => Credential::Token(field(&raw.token)),
            CredentialKind::Json => Credential::Json(
                raw.json
                    .as_ref()
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "null".to_string()),
            ),
            CredentialKind::Basic => Credential::Basic {
                username: field(&raw.username),
                password: field(&raw.password),
            },
            CredentialKind::KeyPair => Credential::KeyPair {
                client_id: field(&raw.client_id),
                client_key: field(&raw.client_key),
            },
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::None => CredentialKind::None,
            Credential::Token(_) => CredentialKind::Token,
            Credential::Json(_) => CredentialKind::Json,
            Credential::Basic { .. } => CredentialKind::Basic,
            Credential::KeyPair { .. } => CredentialKind::KeyPair,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => write!(f, "None"),
            Credential::Token(_) => write!(f, "Token(<redacted>)"),
            Credential::Json(_) => write!(f, "Json(<redacted>)"),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::KeyPair { client_id, .. } => f
                .debug_struct("KeyPair")
                .field("client_id", client_id)
                .field("client_key", &"<redacted>")
                .finish(),
        }
    }
}
