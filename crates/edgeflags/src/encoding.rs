use crate::config::Config;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use edgeflags_core::User;
use serde_json::{Map, Value};

/// Builds the canonical JSON body for a user, redacting private
/// attributes per config, mirroring `LDi_usertourl`'s JSON construction in
/// the original client (minus the base64 step, which `encode_for_url`
/// layers on top).
pub fn encode_for_body(user: &User, config: &Config) -> Vec<u8> {
    let mut obj = Map::new();
    obj.insert("key".to_string(), Value::String(user.key.clone()));
    obj.insert("anonymous".to_string(), Value::Bool(user.anonymous));

    let mut candidates: Map<String, Value> = Map::new();
    if let Some(v) = &user.secondary {
        candidates.insert("secondary".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.ip {
        candidates.insert("ip".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.first_name {
        candidates.insert("firstName".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.last_name {
        candidates.insert("lastName".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.email {
        candidates.insert("email".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.name {
        candidates.insert("name".to_string(), Value::String(v.clone()));
    }
    if let Some(v) = &user.avatar {
        candidates.insert("avatar".to_string(), Value::String(v.clone()));
    }
    for (k, v) in &user.custom {
        candidates.insert(k.clone(), v.clone());
    }

    let mut redacted: Vec<String> = Vec::new();
    if config.all_attributes_private {
        redacted = candidates.keys().cloned().collect();
    } else {
        for name in user
            .private_attribute_names
            .iter()
            .chain(config.private_attribute_names.iter())
        {
            if candidates.contains_key(name) && !redacted.contains(name) {
                redacted.push(name.clone());
            }
        }
    }

    for name in &redacted {
        candidates.remove(name);
    }
    obj.extend(candidates);

    if !redacted.is_empty() {
        redacted.sort();
        obj.insert(
            "privateAttrs".to_string(),
            Value::Array(redacted.into_iter().map(Value::String).collect()),
        );
    }

    serde_json::to_vec(&Value::Object(obj)).expect("user JSON is always serializable")
}

/// `encode-for-url`: the body bytes, base64url-encoded with no padding so
/// they can be embedded directly in a URL path segment.
pub fn encode_for_url(user: &User, config: &Config) -> String {
    URL_SAFE_NO_PAD.encode(encode_for_body(user, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::builder("k").build().unwrap()
    }

    #[test]
    fn encodes_key_and_anonymous() {
        let user = User::new("u1");
        let body = encode_for_body(&user, &cfg());
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["key"], "u1");
        assert_eq!(parsed["anonymous"], false);
    }

    #[test]
    fn all_attributes_private_strips_everything_but_key() {
        let mut user = User::new("u1");
        user.email = Some("a@b.com".to_string());
        let mut config = cfg();
        config.all_attributes_private = true;
        let body = encode_for_body(&user, &config);
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("email").is_none());
        let private_attrs = parsed["privateAttrs"].as_array().unwrap();
        assert!(private_attrs.iter().any(|v| v == "email"));
    }

    #[test]
    fn user_level_private_names_are_redacted() {
        let mut user = User::new("u1");
        user.email = Some("a@b.com".to_string());
        user.private_attribute_names = vec!["email".to_string()];
        let body = encode_for_body(&user, &cfg());
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("email").is_none());
    }

    #[test]
    fn url_encoding_is_base64url_no_pad() {
        let user = User::new("u1");
        let encoded = encode_for_url(&user, &cfg());
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
    }
}
