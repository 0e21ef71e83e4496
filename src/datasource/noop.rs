//! No-op connector: echoes the request payload, touches nothing.

use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use async_trait::async_trait;
use serde_json::Value;

/// Connector for stages that only transform context.
///
/// `invoke` returns the request payload unchanged; the interesting work
/// happens in the stage's transforms and, for the publish field, in the
/// fan-out layer above the pipeline.
#[derive(Debug, Clone)]
pub struct NoneDataSource {
    name: String,
}

impl NoneDataSource {
    /// Creates a no-op connector.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl DataSource for NoneDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: Value) -> Result<Value, ErrorKind> {
        Ok(request)
    }
}
