//! User claims

use serde::{Deserialize, Serialize};

/// Value type used when none is given
pub const STRING_VALUE_TYPE: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Issuer used when none is given
pub const LOCAL_AUTHORITY: &str = "LOCAL AUTHORITY";

/// A single statement about a subject, stored as a flat object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_value_type() -> String {
    STRING_VALUE_TYPE.to_string()
}

fn default_issuer() -> String {
    LOCAL_AUTHORITY.to_string()
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: default_value_type(),
            issuer: default_issuer(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_json_shape() {
        let claim = Claim::new("test_claim", "testClaimValue");
        let json = serde_json::to_value(&claim).unwrap();

        assert_eq!(json["type"], "test_claim");
        assert_eq!(json["value"], "testClaimValue");
        assert_eq!(json["issuer"], LOCAL_AUTHORITY);
    }

    #[test]
    fn test_claim_defaults_when_missing() {
        let claim: Claim = serde_json::from_str(r#"{"type":"sub","value":"42"}"#).unwrap();

        assert_eq!(claim.value_type, STRING_VALUE_TYPE);
        assert_eq!(claim.issuer, LOCAL_AUTHORITY);
    }
}
