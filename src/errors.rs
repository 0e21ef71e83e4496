//! Error types for storyflow resolvers and the change-stream bridge.

use thiserror::Error;

/// The closed set of failure kinds a stage can surface.
///
/// Every error raised inside a pipeline, whether by a transform or by the
/// backend it dispatched to, is one of these. The kind travels upward
/// unchanged so callers can tell an auth failure from a flaky upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Malformed caller arguments or a malformed stage request payload.
    #[error("invalid request: {0}")]
    Validation(String),

    /// I/O failure against a data source, including non-2xx upstream status.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The caller or service lacks the capability for the operation.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// An external response did not have the expected shape.
    #[error("unexpected upstream response: {0}")]
    UpstreamFormat(String),

    /// An update was issued against a key that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ErrorKind {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a backend-unavailable error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Creates an authorization-denied error.
    #[must_use]
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::AuthorizationDenied(msg.into())
    }

    /// Creates an upstream-format error.
    #[must_use]
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamFormat(msg.into())
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Returns a stable label for event payloads and log fields.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::AuthorizationDenied(_) => "authorization_denied",
            Self::UpstreamFormat(_) => "upstream_format",
            Self::NotFound(_) => "not_found",
        }
    }
}

/// A pipeline failure, tagged with the stage that raised it.
///
/// The remaining stages of the pipeline are never executed once one of
/// these exists; the caller sees the whole field invocation as failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage '{stage}' failed: {kind}")]
pub struct PipelineError {
    /// Name of the failing stage.
    pub stage: String,
    /// What went wrong.
    pub kind: ErrorKind,
}

impl PipelineError {
    /// Creates a pipeline error at the given stage.
    #[must_use]
    pub fn at(stage: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            stage: stage.into(),
            kind,
        }
    }
}

/// Errors surfaced by the field-invocation surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No resolver is registered for the field.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The field requires an authenticated caller and none was supplied.
    #[error("field '{field}' requires an authenticated caller")]
    Unauthorized {
        /// The field that rejected the invocation.
        field: String,
    },

    /// The field's pipeline aborted.
    #[error(transparent)]
    Resolver(#[from] PipelineError),
}

/// Errors surfaced by the change-stream bridge to its host.
///
/// The bridge performs no retries of its own; a returned error is the
/// host's signal to redeliver according to the feed's own policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A change record could not be turned into a publish payload.
    #[error("malformed change record for key '{key}': {reason}")]
    MalformedRecord {
        /// Partition key of the offending record.
        key: String,
        /// Why it could not be processed.
        reason: String,
    },

    /// The publish invocation itself failed.
    #[error("publish invocation failed: {0}")]
    Publish(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_labels_are_stable() {
        assert_eq!(ErrorKind::validation("x").label(), "validation");
        assert_eq!(ErrorKind::backend("x").label(), "backend_unavailable");
        assert_eq!(ErrorKind::denied("x").label(), "authorization_denied");
        assert_eq!(ErrorKind::upstream("x").label(), "upstream_format");
        assert_eq!(ErrorKind::not_found("x").label(), "not_found");
    }

    #[test]
    fn pipeline_error_names_the_failing_stage() {
        let err = PipelineError::at("getSecret", ErrorKind::denied("no read-secret capability"));
        assert_eq!(err.stage, "getSecret");
        assert!(err.to_string().contains("getSecret"));
        assert!(err.to_string().contains("authorization denied"));
    }

    #[test]
    fn api_error_wraps_pipeline_error() {
        let err: ApiError = PipelineError::at("init", ErrorKind::backend("table down")).into();
        match err {
            ApiError::Resolver(inner) => assert_eq!(inner.stage, "init"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
