//! Scopes

use serde::{Deserialize, Serialize};

/// Kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// Grants access to identity claims
    #[default]
    Identity,
    /// Grants access to an API
    Resource,
}

/// Claim type carried by a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeClaim {
    pub name: String,
    #[serde(default)]
    pub always_include_in_id_token: bool,
}

/// A named permission a client can request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub scope_type: ScopeType,
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub claims: Vec<ScopeClaim>,
}

impl Scope {
    pub fn identity(name: impl Into<String>) -> Self {
        Self::new(name, ScopeType::Identity)
    }

    pub fn resource(name: impl Into<String>) -> Self {
        Self::new(name, ScopeType::Resource)
    }

    fn new(name: impl Into<String>, scope_type: ScopeType) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            scope_type,
            enabled: true,
            required: false,
            claims: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_claim(mut self, name: impl Into<String>) -> Self {
        self.claims.push(ScopeClaim {
            name: name.into(),
            always_include_in_id_token: false,
        });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_type_serialization() {
        let scope = Scope::resource("api1");
        let json = serde_json::to_value(&scope).unwrap();

        assert_eq!(json["type"], "resource");
        assert!(json.get("displayName").is_none());
    }

    #[test]
    fn test_identity_scope_claims() {
        let scope = Scope::identity("profile")
            .with_display_name("User profile")
            .with_claim("name")
            .with_claim("website");

        assert_eq!(scope.claims.len(), 2);
        assert_eq!(scope.scope_type, ScopeType::Identity);
    }
}
