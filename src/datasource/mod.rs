//! Backend connectors behind a uniform dispatch contract.
//!
//! Four variants exist: the document store, the secret store over HTTP,
//! a generic HTTP upstream, and a no-op echo. A stage is bound to exactly
//! one variant at definition time and never switches at runtime.

pub mod document;
pub mod http;
pub mod noop;
pub mod secrets;
pub mod signing;

pub use document::{DocumentDataSource, DocumentRequest};
pub use http::{HttpDataSource, HttpParams, HttpRequest};
pub use noop::NoneDataSource;
pub use secrets::SecretStoreDataSource;
pub use signing::ServiceKey;

use crate::errors::ErrorKind;
use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

/// Uniform dispatch contract for backend connectors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the connector's name, used in logs and events.
    fn name(&self) -> &str;

    /// Dispatches one backend-specific request payload.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure as an [`ErrorKind`]; the caller
    /// treats any error as terminal for its pipeline.
    async fn invoke(&self, request: Value) -> Result<Value, ErrorKind>;
}
