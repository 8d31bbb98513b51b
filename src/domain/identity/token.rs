//! Refresh tokens and authorization codes

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Data shared by every grant artifact tracked per subject and client
pub trait TokenMetadata: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    fn subject_id(&self) -> &str;

    fn client_id(&self) -> &str;

    fn scopes(&self) -> &[String];

    fn created_at(&self) -> DateTime<Utc>;

    /// Lifetime in seconds
    fn lifetime(&self) -> u64;

    /// Absolute expiry, used as the cache expiry as well
    fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = i64::try_from(self.lifetime()).unwrap_or(i64::MAX);
        self.created_at()
            .checked_add_signed(Duration::try_seconds(lifetime).unwrap_or(Duration::MAX))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// A long-lived credential used to obtain new access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub subject_id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub creation_time: DateTime<Utc>,
    pub lifetime: u64,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    4
}

impl RefreshToken {
    pub fn new(
        subject_id: impl Into<String>,
        client_id: impl Into<String>,
        scopes: Vec<String>,
        lifetime: u64,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            client_id: client_id.into(),
            scopes,
            creation_time: Utc::now(),
            lifetime,
            version: default_version(),
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.creation_time = at;
        self
    }
}

impl TokenMetadata for RefreshToken {
    fn subject_id(&self) -> &str {
        &self.subject_id
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.creation_time
    }

    fn lifetime(&self) -> u64 {
        self.lifetime
    }
}

/// A one-time code issued by the authorize endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    pub subject_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub lifetime: u64,
}

impl AuthorizationCode {
    pub fn new(
        subject_id: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
        lifetime: u64,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            nonce: None,
            code_challenge: None,
            creation_time: Utc::now(),
            lifetime,
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_code_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.code_challenge = Some(challenge.into());
        self
    }
}

impl TokenMetadata for AuthorizationCode {
    fn subject_id(&self) -> &str {
        &self.subject_id
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.creation_time
    }

    fn lifetime(&self) -> u64 {
        self.lifetime
    }
}
