//! Secret-store-over-HTTP connector.

use crate::config::SecretStoreConfig;
use crate::datasource::signing::ServiceKey;
use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use crate::model::now_iso8601;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct SecretRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    value: String,
}

/// Connector that reads exactly one named secret over signed HTTP.
///
/// Least privilege is enforced before any network I/O: a request for any
/// name other than the configured one is an authorization failure, no
/// matter what the remote store would have said.
#[derive(Debug)]
pub struct SecretStoreDataSource {
    name: String,
    client: reqwest::Client,
    config: SecretStoreConfig,
    key: ServiceKey,
}

impl SecretStoreDataSource {
    /// Creates a connector for the configured endpoint and permitted name.
    #[must_use]
    pub fn new(name: impl Into<String>, config: SecretStoreConfig) -> Self {
        let key = ServiceKey::new(&config.key_id, &config.signing_key);
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            config,
            key,
        }
    }

    fn resource_path(secret_name: &str) -> String {
        format!("/v1/secret/{secret_name}")
    }
}

#[async_trait]
impl DataSource for SecretStoreDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: Value) -> Result<Value, ErrorKind> {
        let request: SecretRequest = serde_json::from_value(request)
            .map_err(|e| ErrorKind::validation(format!("malformed secret request: {e}")))?;

        if request.name != self.config.secret_name {
            return Err(ErrorKind::denied(format!(
                "service may only read secret '{}'",
                self.config.secret_name
            )));
        }

        let path = Self::resource_path(&request.name);
        let date = now_iso8601();
        let signature = self.key.sign("GET", &path, &date);
        let url = format!("{}{path}", self.config.endpoint.trim_end_matches('/'));

        tracing::debug!(secret = %request.name, "fetching secret");

        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout())
            .header("x-identity-key", self.key.key_id())
            .header("x-identity-date", &date)
            .header("x-identity-signature", &signature)
            .send()
            .await
            .map_err(|e| ErrorKind::backend(format!("secret store unreachable: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ErrorKind::denied(format!(
                    "secret store rejected the service identity for '{}'",
                    request.name
                )));
            }
            status if !status.is_success() => {
                return Err(ErrorKind::backend(format!(
                    "secret store returned status {status}"
                )));
            }
            _ => {}
        }

        let body: SecretResponse = response
            .json()
            .await
            .map_err(|e| ErrorKind::upstream(format!("malformed secret response: {e}")))?;

        Ok(Value::String(body.value))
    }
}
