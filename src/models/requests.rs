//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::hooks::TriggerContext;

const MAX_KEY_LEN: usize = 256;

/// Request body for PUT /cache/:namespace
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in milliseconds; 0 means no expiry
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LEN {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LEN
            ));
        }
        None
    }
}

/// Request body for POST /cache/:namespace/invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Glob pattern; `*` matches any run of characters
    pub pattern: String,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

/// Request body for POST /events/:trigger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerRequest {
    /// Placeholder values. Non-string JSON values are used in their JSON
    /// text form.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl TriggerRequest {
    pub fn into_context(self) -> TriggerContext {
        self.context
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "available", "value": ["a", "b"]}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "available");
        assert_eq!(req.value, json!(["a", "b"]));
        assert!(req.ttl_ms.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl_ms": 60000}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl_ms, Some(60000));
    }

    #[test]
    fn test_validate_key() {
        let mut req = SetRequest {
            key: "".to_string(),
            value: json!(1),
            ttl_ms: None,
        };
        assert!(req.validate().is_some());

        req.key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(req.validate().unwrap().contains("256"));

        req.key = "valid_key".to_string();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_pattern() {
        let req = InvalidateRequest {
            pattern: String::new(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_trigger_context_coercion() {
        let json = r#"{"context": {"pluginId": "frontend@mag", "attempt": 2, "force": true}}"#;
        let req: TriggerRequest = serde_json::from_str(json).unwrap();
        let context = req.into_context();
        assert_eq!(context["pluginId"], "frontend@mag");
        assert_eq!(context["attempt"], "2");
        assert_eq!(context["force"], "true");

        let empty: TriggerRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.into_context().is_empty());
    }
}
