//! HTTP transport for the healthcare REST backend

use super::{Transport, TransportError};
use crate::resource::{Record, RecordId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Transport bound to one collection endpoint, e.g. `http://localhost:8090/clinics`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    collection_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `endpoint` below `base_url`
    pub fn new(base_url: &str, endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("caredesk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Self::with_client(client, base_url, endpoint, timeout)
    }

    /// Share one reqwest client between several endpoints
    pub fn with_client(
        client: Client,
        base_url: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let collection_url = collection_url(base_url, endpoint)?;
        Ok(Self {
            client,
            collection_url,
            timeout,
        })
    }

    fn item_url(&self, id: &RecordId) -> String {
        format!(
            "{}/{}",
            self.collection_url.as_str().trim_end_matches('/'),
            urlencoding::encode(&id.to_string())
        )
    }

    fn sub_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn send_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(error.to_string())
        }
    }

    /// Read the body and turn non-2xx statuses into errors
    async fn read_body(&self, url: &str, response: Response) -> Result<String, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.send_error(e))?;

        if status == StatusCode::NOT_FOUND {
            tracing::warn!("Not found: {}", url);
            return Err(TransportError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: sanitize_for_log(&body),
            });
        }

        Ok(body)
    }
}

/// Resolve `endpoint` against `base_url`, tolerating a missing trailing slash
pub fn collection_url(base_url: &str, endpoint: &str) -> Result<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base).with_context(|| format!("Invalid base URL: {}", base_url))?;
    base.join(endpoint.trim_start_matches('/'))
        .with_context(|| format!("Invalid endpoint: {}", endpoint))
}

fn parse_record(value: Value) -> Result<Record, TransportError> {
    Record::from_json(value).map_err(|e| TransportError::Decode(e.to_string()))
}

fn parse_json(body: &str) -> Result<Value, TransportError> {
    serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list(&self) -> Result<Vec<Record>, TransportError> {
        let url = self.collection_url.as_str();
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let body = self.read_body(url, response).await?;

        match parse_json(&body)? {
            Value::Array(items) => items.into_iter().map(parse_record).collect(),
            other => Err(TransportError::Decode(format!(
                "expected an array, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn create(&self, record: &Record) -> Result<Record, TransportError> {
        let url = self.collection_url.as_str();
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&record.to_json_without_id())
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let body = self.read_body(url, response).await?;

        if body.trim().is_empty() {
            return Err(TransportError::Decode(
                "create returned an empty body".to_string(),
            ));
        }
        parse_record(parse_json(&body)?)
    }

    async fn update(
        &self,
        id: &RecordId,
        record: &Record,
    ) -> Result<Option<Record>, TransportError> {
        let url = self.item_url(id);
        tracing::debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(&record.to_json())
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let body = self.read_body(&url, response).await?;

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_record(parse_json(&body)?).map(Some)
    }

    async fn delete(&self, id: &RecordId) -> Result<(), TransportError> {
        let url = self.item_url(id);
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.read_body(&url, response).await?;
        Ok(())
    }

    async fn options(&self, path: &str) -> Result<Vec<Value>, TransportError> {
        let url = self.sub_url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let body = self.read_body(&url, response).await?;

        match parse_json(&body)? {
            Value::Array(items) => Ok(items),
            other => Err(TransportError::Decode(format!(
                "expected an array of options, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn endpoint(&self) -> &str {
        self.collection_url.as_str()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_url_joins_with_or_without_slash() {
        let a = collection_url("http://localhost:8090", "clinics").unwrap();
        let b = collection_url("http://localhost:8090/", "/clinics").unwrap();
        assert_eq!(a.as_str(), "http://localhost:8090/clinics");
        assert_eq!(a, b);

        let nested = collection_url("http://api.example.com/v1", "medical-insurances").unwrap();
        assert_eq!(nested.as_str(), "http://api.example.com/v1/medical-insurances");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(collection_url("not a url", "clinics").is_err());
    }

    #[test]
    fn test_item_url_encodes_id() {
        let transport =
            HttpTransport::new("http://localhost:8090", "clinics", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.item_url(&RecordId::from("a b/c")),
            "http://localhost:8090/clinics/a%20b%2Fc"
        );
        assert_eq!(
            transport.item_url(&RecordId::Int(42)),
            "http://localhost:8090/clinics/42"
        );
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.len() < body.len());
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }
}
