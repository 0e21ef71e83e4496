//! Generic HTTP connector for a fixed upstream host.

use crate::datasource::DataSource;
use crate::errors::ErrorKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Request payload the HTTP connector accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method name.
    pub method: String,
    /// Path relative to the connector's fixed base URL.
    pub resource_path: String,
    /// Headers, query and body.
    #[serde(default)]
    pub params: HttpParams,
}

/// Optional parts of an HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpParams {
    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query string parameters.
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// JSON body, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Connector that issues requests exactly as constructed by the stage.
///
/// The raw response comes back as `{status_code, headers, body}` with the
/// body kept as a string; any non-2xx status is a backend failure.
#[derive(Debug)]
pub struct HttpDataSource {
    name: String,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDataSource {
    /// Creates a connector for the fixed upstream host.
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: Value) -> Result<Value, ErrorKind> {
        let request: HttpRequest = serde_json::from_value(request)
            .map_err(|e| ErrorKind::validation(format!("malformed http request: {e}")))?;

        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                ErrorKind::validation(format!("unsupported http method '{}'", request.method))
            })?;

        let url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            request.resource_path
        );

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(self.timeout)
            .query(&request.params.query);
        for (name, value) in &request.params.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.params.body {
            builder = builder.json(body);
        }

        tracing::debug!(url = %url, "dispatching upstream http request");

        let response = builder
            .send()
            .await
            .map_err(|e| ErrorKind::backend(format!("upstream unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorKind::backend(format!(
                "upstream returned status {status}"
            )));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ErrorKind::backend(format!("failed reading upstream body: {e}")))?;

        Ok(json!({
            "status_code": status.as_u16(),
            "headers": headers,
            "body": body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_payload_round_trips() {
        let payload = json!({
            "method": "POST",
            "resource_path": "/v1/chat/completions",
            "params": {
                "headers": {"Authorization": "Bearer k"},
                "body": {"model": "m"},
            },
        });

        let parsed: HttpRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed.method, "POST");
        assert_eq!(parsed.resource_path, "/v1/chat/completions");
        assert_eq!(
            parsed.params.headers.get("Authorization"),
            Some(&"Bearer k".to_string())
        );
    }

    #[test]
    fn params_default_when_absent() {
        let parsed: HttpRequest =
            serde_json::from_value(json!({"method": "GET", "resource_path": "/"})).unwrap();
        assert!(parsed.params.headers.is_empty());
        assert!(parsed.params.body.is_none());
    }

    #[tokio::test]
    async fn bad_method_is_a_validation_error() {
        let source = HttpDataSource::new(
            "upstream",
            "http://127.0.0.1:9",
            Duration::from_millis(100),
        );
        let err = source
            .invoke(json!({"method": "NOT A METHOD", "resource_path": "/"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_backend_unavailable() {
        // Port 9 (discard) is not listening; connection fails fast.
        let source = HttpDataSource::new(
            "upstream",
            "http://127.0.0.1:9",
            Duration::from_millis(250),
        );
        let err = source
            .invoke(json!({"method": "GET", "resource_path": "/"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::BackendUnavailable(_)));
    }
}
