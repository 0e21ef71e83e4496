//! Per-invocation request context threaded through a pipeline execution.

use crate::errors::ErrorKind;
use crate::identity::Identity;
use serde_json::Value;
use std::collections::HashMap;

/// The evolving state of one pipeline execution.
///
/// A fresh context is allocated for every invocation and dropped when the
/// pipeline completes; nothing here is shared between concurrent
/// executions. Two channels carry data forward:
///
/// - `prev` is the previous stage's logical output, visible only to the
///   immediately following stage;
/// - the stash is a key/value map readable and writable by every stage,
///   and is the only way to pass data to a non-adjacent stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Caller-supplied field arguments.
    pub arguments: Value,
    /// Caller identity, when authenticated.
    pub identity: Option<Identity>,
    /// Previous stage's logical output. `Null` before the first stage.
    pub prev: Value,
    /// Raw backend result of the current stage, set between dispatch and
    /// the response transform. `Null` at any other time.
    pub result: Value,
    stash: HashMap<String, Value>,
}

impl RequestContext {
    /// Creates a fresh context for one invocation.
    #[must_use]
    pub fn new(arguments: Value, identity: Option<Identity>) -> Self {
        Self {
            arguments,
            identity,
            prev: Value::Null,
            result: Value::Null,
            stash: HashMap::new(),
        }
    }

    /// Writes a stash value, overwriting any previous entry.
    pub fn stash_put(&mut self, key: impl Into<String>, value: Value) {
        self.stash.insert(key.into(), value);
    }

    /// Reads a stash value.
    #[must_use]
    pub fn stash_get(&self, key: &str) -> Option<&Value> {
        self.stash.get(key)
    }

    /// Reads a stash value that must be a string.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Validation` if the key is absent or not a string.
    pub fn stash_string(&self, key: &str) -> Result<String, ErrorKind> {
        self.stash
            .get(key)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ErrorKind::validation(format!("stash is missing string key '{key}'")))
    }

    /// Returns the number of stash entries.
    #[must_use]
    pub fn stash_len(&self) -> usize {
        self.stash.len()
    }

    /// Returns the caller identity or an authorization error.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::AuthorizationDenied` for anonymous invocations.
    pub fn require_identity(&self) -> Result<&Identity, ErrorKind> {
        self.identity
            .as_ref()
            .ok_or_else(|| ErrorKind::denied("caller identity required".to_string()))
    }

    /// Reads a string argument from the caller-supplied input.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::Validation` if the argument is absent, not a
    /// string, or empty.
    pub fn string_argument(&self, name: &str) -> Result<String, ErrorKind> {
        let value = self
            .arguments
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ErrorKind::validation(format!("argument '{name}' must be a string")))?;
        if value.is_empty() {
            return Err(ErrorKind::validation(format!(
                "argument '{name}' must not be empty"
            )));
        }
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn stash_round_trips_values() {
        let mut ctx = RequestContext::new(json!({}), None);
        assert_eq!(ctx.stash_len(), 0);
        ctx.stash_put("id", json!("abc"));

        assert_eq!(ctx.stash_get("id"), Some(&json!("abc")));
        assert_eq!(ctx.stash_string("id").unwrap(), "abc");
        assert!(ctx.stash_string("missing").is_err());

        // Overwrite, not append.
        ctx.stash_put("id", json!("def"));
        assert_eq!(ctx.stash_len(), 1);
        assert_eq!(ctx.stash_string("id").unwrap(), "def");
    }

    #[test]
    fn string_argument_validates_shape() {
        let ctx = RequestContext::new(json!({"prompt": "a dragon", "count": 3}), None);

        assert_eq!(ctx.string_argument("prompt").unwrap(), "a dragon");
        assert!(matches!(
            ctx.string_argument("count"),
            Err(ErrorKind::Validation(_))
        ));
        assert!(matches!(
            ctx.string_argument("missing"),
            Err(ErrorKind::Validation(_))
        ));
    }

    #[test]
    fn empty_string_argument_is_rejected() {
        let ctx = RequestContext::new(json!({"prompt": ""}), None);
        assert!(matches!(
            ctx.string_argument("prompt"),
            Err(ErrorKind::Validation(_))
        ));
    }

    #[test]
    fn require_identity_denies_anonymous() {
        let ctx = RequestContext::new(json!({}), None);
        assert!(matches!(
            ctx.require_identity(),
            Err(ErrorKind::AuthorizationDenied(_))
        ));

        let ctx = RequestContext::new(json!({}), Some(Identity::user("u1")));
        assert_eq!(ctx.require_identity().unwrap().sub, "u1");
    }
}
