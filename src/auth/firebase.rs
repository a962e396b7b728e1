//! Firebase-backed identity provider.
//!
//! Token verification checks RS256 signatures against the securetoken JWKS,
//! which is fetched over HTTPS and cached in-process for the lifetime the
//! provider advertises via Cache-Control. Profile lookups go through the
//! identitytoolkit REST API, authorized by an OAuth2 access token minted from
//! the configured service account.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{AuthError, IdentityProvider, SubjectIdentity, UserProfile};
use crate::config::FirebaseConfig;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const ACCOUNT_LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";
const IDENTITY_SCOPE: &str = "https://www.googleapis.com/auth/identitytoolkit";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
// Refresh the minted access token a minute before the provider expires it
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

pub struct FirebaseIdentity {
    config: FirebaseConfig,
    http: reqwest::Client,
    keys: RwLock<Option<KeyCache>>,
    token: RwLock<Option<CachedToken>>,
}

struct KeyCache {
    keys: HashMap<String, RsaComponents>,
    expires_at: Instant,
}

#[derive(Clone)]
struct RsaComponents {
    n: String,
    e: String,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwksKey>,
}

#[derive(Debug, Deserialize)]
struct JwksKey {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    users: Option<Vec<LookupUser>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl FirebaseIdentity {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            keys: RwLock::new(None),
            token: RwLock::new(None),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.config.project_id)
    }

    /// Resolve the verification key for a token's `kid`, refreshing the JWKS
    /// cache when it is stale or the provider has rotated keys.
    async fn signing_key(&self, kid: &str) -> Result<RsaComponents, AuthError> {
        {
            let cache = self.keys.read().await;
            if let Some(cache) = cache.as_ref() {
                if cache.expires_at > Instant::now() {
                    if let Some(key) = cache.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }
        }

        let mut guard = self.keys.write().await;

        // Another request may have refreshed while we waited on the lock
        if let Some(cache) = guard.as_ref() {
            if cache.expires_at > Instant::now() {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh.keys.get(kid).cloned();
        *guard = Some(fresh);

        key.ok_or_else(|| AuthError::InvalidCredential(format!("unknown signing key: {}", kid)))
    }

    async fn fetch_keys(&self) -> Result<KeyCache, AuthError> {
        let response = self
            .http
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("key fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_KEY_TTL);

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("malformed key document: {}", e)))?;

        let keys = document
            .keys
            .into_iter()
            .map(|k| (k.kid, RsaComponents { n: k.n, e: k.e }))
            .collect();

        tracing::debug!(ttl_secs = ttl.as_secs(), "refreshed identity provider keys");

        Ok(KeyCache {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }

    /// OAuth2 access token for the service account, cached until shortly
    /// before expiry.
    async fn access_token(&self) -> Result<String, AuthError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let minted = self.mint_access_token().await?;
        let value = minted.value.clone();
        *guard = Some(minted);
        Ok(value)
    }

    async fn mint_access_token(&self) -> Result<CachedToken, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.config.client_email,
            scope: IDENTITY_SCOPE,
            aud: OAUTH_TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.config.private_key.as_bytes()).map_err(|e| {
            AuthError::ProviderUnavailable(format!("invalid service account key: {}", e))
        })?;

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AuthError::ProviderUnavailable(format!("assertion signing failed: {}", e)))?;

        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            AuthError::ProviderUnavailable(format!("malformed token response: {}", e))
        })?;

        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_token(&self, token: &str) -> Result<SubjectIdentity, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidCredential(format!("malformed token: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidCredential(format!(
                "unexpected signing algorithm: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidCredential("token header missing key id".into()))?;

        let components = self.signing_key(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&components.n, &components.e)
            .map_err(|e| AuthError::ProviderUnavailable(format!("bad key material: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.config.project_id]);
        validation.set_issuer(&[self.issuer()]);

        let data = decode::<IdTokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

        Ok(SubjectIdentity {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }

    async fn get_user(&self, subject: &str) -> Result<UserProfile, AuthError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(ACCOUNT_LOOKUP_URL)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "localId": [subject] }))
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("account lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "account lookup returned {}",
                response.status()
            )));
        }

        let body: LookupResponse = response.json().await.map_err(|e| {
            AuthError::ProviderUnavailable(format!("malformed lookup response: {}", e))
        })?;

        body.users
            .and_then(|mut users| (!users.is_empty()).then(|| users.remove(0)))
            .map(|user| UserProfile {
                uid: user.local_id,
                email: user.email,
                display_name: user.display_name,
            })
            .ok_or_else(|| AuthError::UnknownSubject(subject.to_string()))
    }
}

/// Parse the max-age directive out of a Cache-Control header value.
fn max_age_seconds(value: &str) -> Option<u64> {
    value
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|age| age.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> FirebaseIdentity {
        FirebaseIdentity::new(FirebaseConfig {
            project_id: "demo-project".to_string(),
            client_email: "svc@demo-project.iam.gserviceaccount.com".to_string(),
            private_key: "not-a-real-key".to_string(),
        })
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_without_key_fetch() {
        // decode_header fails before any network I/O happens
        let err = provider().verify_token("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let err = provider().verify_token("").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[test]
    fn parses_max_age_from_cache_control() {
        assert_eq!(
            max_age_seconds("public, max-age=19204, must-revalidate"),
            Some(19204)
        );
        assert_eq!(max_age_seconds("no-store"), None);
    }
}
