use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies the caller for evaluation and analytics purposes.
///
/// Field set matches `LDUser_i` in the original C header: a required key
/// plus a handful of well-known optional attributes, a free-form custom
/// map, and a private-attribute name list that is redacted by the encoder
/// rather than dropped from the struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub key: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub private_attribute_names: Vec<String>,
}

impl User {
    /// Mirrors `LDUserNew`: every other field starts empty/default.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            anonymous: false,
            secondary: None,
            ip: None,
            first_name: None,
            last_name: None,
            email: None,
            name: None,
            avatar: None,
            custom: HashMap::new(),
            private_attribute_names: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_only_key() {
        let u = User::new("user-1");
        assert_eq!(u.key, "user-1");
        assert!(!u.anonymous);
        assert!(u.custom.is_empty());
        assert!(u.private_attribute_names.is_empty());
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let u = User::new("user-1");
        let json = serde_json::to_value(&u).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("ip").is_none());
    }
}
