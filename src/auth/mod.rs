use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod firebase;

pub use firebase::FirebaseIdentity;

/// Stable identity asserted by the identity provider for an authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectIdentity {
    /// Provider-issued subject id; the sole ownership predicate for items.
    pub subject: String,
    pub email: Option<String>,
}

/// Profile record for a known subject, as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed, expired, or unverifiable credential. Terminal for the
    /// request - verification is never retried.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The provider's key or lookup endpoints could not be reached. A server
    /// side fault, distinct from a bad token.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),
}

/// External identity provider, consumed as a black box. Tests substitute a
/// stub; production wires [`FirebaseIdentity`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Cryptographically validate a bearer credential and decode the subject.
    async fn verify_token(&self, token: &str) -> Result<SubjectIdentity, AuthError>;

    /// Look up the profile for a previously verified subject id.
    async fn get_user(&self, subject: &str) -> Result<UserProfile, AuthError>;
}
