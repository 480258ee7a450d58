use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::FlagValue;

/// Attribute name that resolves to [`EvaluationContext::user_id`].
pub const USER_ID_ATTRIBUTE: &str = "userId";

/// Attribute name that resolves to [`EvaluationContext::session_id`].
pub const SESSION_ID_ATTRIBUTE: &str = "sessionId";

/// Who is asking for a flag value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, FlagValue>,
}

impl EvaluationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context for a user.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::new()
    }

    /// Set the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merge attributes, replacing existing keys.
    pub fn attributes(mut self, attrs: HashMap<String, FlagValue>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    /// Whether the context carries no identity and no attributes.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.session_id.is_none() && self.attributes.is_empty()
    }

    /// Resolve an attribute. `userId` and `sessionId` map to the identity fields.
    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.attributes.get(key)
    }

    /// Looks up a targeting attribute.
    ///
    /// `userId` and `sessionId` read the identity fields; every other name
    /// reads the attribute map. Returns `None` when the attribute is absent.
    pub fn resolve(&self, attribute: &str) -> Option<FlagValue> {
        match attribute {
            USER_ID_ATTRIBUTE => self.user_id.clone().map(FlagValue::String),
            SESSION_ID_ATTRIBUTE => self.session_id.clone().map(FlagValue::String),
            other => self.attributes.get(other).cloned(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EvaluationContextBuilder {
    user_id: Option<String>,
    session_id: Option<String>,
    attributes: HashMap<String, FlagValue>,
}

impl EvaluationContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build the context.
    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            user_id: self.user_id,
            session_id: self.session_id,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let context = EvaluationContextBuilder::new()
            .user_id("user-123")
            .session_id("sess-9")
            .attribute("plan", "premium")
            .attribute("beta", true)
            .build();

        assert_eq!(context.user_id, Some("user-123".to_string()));
        assert_eq!(context.session_id, Some("sess-9".to_string()));
        assert!(context.get("plan").is_some());
        assert!(context.get("beta").is_some());
    }

    #[test]
    fn test_resolve_identity_fields() {
        let context = EvaluationContext::with_user_id("u1").session_id("s1");

        assert_eq!(context.resolve("userId"), Some(FlagValue::from("u1")));
        assert_eq!(context.resolve("sessionId"), Some(FlagValue::from("s1")));
    }

    #[test]
    fn test_resolve_identity_not_shadowed_by_attribute() {
        let context = EvaluationContext::new().attribute("userId", "from-map");

        assert_eq!(context.resolve("userId"), None);
    }

    #[test]
    fn test_resolve_missing_attribute() {
        let context = EvaluationContext::new().attribute("plan", "free");

        assert_eq!(context.resolve("country"), None);
        assert_eq!(context.resolve("plan"), Some(FlagValue::from("free")));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let context = EvaluationContext::with_user_id("u1").session_id("s1");
        let json = serde_json::to_value(&context).unwrap();

        assert_eq!(json["userId"], "u1");
        assert_eq!(json["sessionId"], "s1");
        assert!(json.get("attributes").is_none());
    }
}
