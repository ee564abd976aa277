//! Identifier and credential newtypes.
//!
//! [`SessionId`] names the per-customer event channel; it can only be built
//! from a non-blank string so the client never dials `/ws/`. [`AuthToken`]
//! wraps the bearer credential and keeps it out of `Debug` output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

/// Identifier of the customer channel an event stream is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session id, rejecting empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::EmptySessionId);
        }
        Ok(Self(value))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for SessionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token presented on the `token` query parameter.
///
/// The token is never fetched or refreshed here; callers hand it in.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw token. Only the endpoint builder should need this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl From<String> for AuthToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AuthToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn session_id_accepts_plain_value() {
        let id = SessionId::new("cust-42").unwrap();
        assert_eq!(id.as_str(), "cust-42");
        assert_eq!(id.to_string(), "cust-42");
    }

    #[test]
    fn session_id_rejects_blank() {
        assert_matches!(SessionId::new(""), Err(CoreError::EmptySessionId));
        assert_matches!(SessionId::new("   "), Err(CoreError::EmptySessionId));
    }

    #[test]
    fn session_id_try_from() {
        let id: SessionId = "abc".try_into().unwrap();
        assert_eq!(id.into_inner(), "abc");
        assert!(SessionId::try_from(String::new()).is_err());
    }

    #[test]
    fn session_id_serde_is_transparent() {
        let id = SessionId::new("c1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
        let back: SessionId = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("s3cret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("s3cret"));
        assert_eq!(token.expose(), "s3cret");
    }
}
