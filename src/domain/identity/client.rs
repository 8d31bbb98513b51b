//! OAuth2 / OpenID Connect client metadata

use serde::{Deserialize, Serialize};

/// A relying party registered with the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: String,
    pub client_name: String,
    pub enabled: bool,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default)]
    pub allowed_scopes: Vec<String>,
    #[serde(default)]
    pub require_consent: bool,
    /// Lifetime of identity tokens, in seconds
    pub identity_token_lifetime: u64,
    /// Lifetime of access tokens, in seconds
    pub access_token_lifetime: u64,
    /// Lifetime of authorization codes, in seconds
    pub authorization_code_lifetime: u64,
    /// Absolute lifetime of refresh tokens, in seconds
    pub absolute_refresh_token_lifetime: u64,
}

impl Client {
    pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            enabled: true,
            redirect_uris: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
            require_consent: true,
            identity_token_lifetime: 300,
            access_token_lifetime: 3600,
            authorization_code_lifetime: 300,
            absolute_refresh_token_lifetime: 2_592_000,
        }
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    pub fn with_allowed_scope(mut self, scope: impl Into<String>) -> Self {
        self.allowed_scopes.push(scope.into());
        self
    }

    pub fn without_consent(mut self) -> Self {
        self.require_consent = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn allows_scope(&self, scope: &str) -> bool {
        self.allowed_scopes.iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = Client::new("web", "Web App");
        assert!(client.enabled);
        assert!(client.require_consent);
        assert_eq!(client.access_token_lifetime, 3600);
    }

    #[test]
    fn test_client_serializes_camel_case() {
        let client = Client::new("web", "Web App").with_allowed_scope("openid");
        let json = serde_json::to_value(&client).unwrap();

        assert_eq!(json["clientId"], "web");
        assert_eq!(json["allowedScopes"][0], "openid");
    }

    #[test]
    fn test_allows_scope() {
        let client = Client::new("web", "Web App").with_allowed_scope("openid");
        assert!(client.allows_scope("openid"));
        assert!(!client.allows_scope("email"));
    }
}
