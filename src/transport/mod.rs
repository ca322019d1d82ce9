//! Backend transport
//!
//! A [`Transport`] performs list/create/update/delete calls for one
//! resource endpoint, plus lookups of the option lists served below it.
//! The controller only ever sees this trait.
//!
//! # Module Structure
//!
//! - [`http`] - REST implementation on top of reqwest
//! - [`memory`] - In-process store used by offline mode and tests

pub mod http;
pub mod memory;

use crate::resource::{Record, RecordId};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// Any failure reported by a transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
            || matches!(self, TransportError::Status { status: 404, .. })
    }
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Fetch every record of the endpoint
    async fn list(&self) -> Result<Vec<Record>, TransportError>;

    /// Create a record; the returned record carries the assigned id
    async fn create(&self, record: &Record) -> Result<Record, TransportError>;

    /// Replace a record. `None` means the backend acknowledged without a body.
    async fn update(&self, id: &RecordId, record: &Record)
        -> Result<Option<Record>, TransportError>;

    /// Delete a record
    async fn delete(&self, id: &RecordId) -> Result<(), TransportError>;

    /// Option list served at `path` below the endpoint, e.g. `enums`.
    /// Backends without option lists serve none.
    async fn options(&self, _path: &str) -> Result<Vec<Value>, TransportError> {
        Ok(Vec::new())
    }

    /// Endpoint description for logs
    fn endpoint(&self) -> &str;
}

/// Format a transport error for display
/// Keeps raw backend bodies out of the UI
pub fn format_transport_error(error: &TransportError) -> String {
    match error {
        TransportError::NotFound(_) => "Record not found.".to_string(),
        TransportError::Timeout(_) => {
            "The server took too long to respond. Please try again.".to_string()
        },
        TransportError::Network(_) => {
            "Could not reach the server. Check your network connection.".to_string()
        },
        TransportError::Decode(_) => "The server sent an unexpected response.".to_string(),
        TransportError::Status { status, .. } => match status {
            400 | 422 => "Invalid request. Check the entered values.".to_string(),
            401 | 403 => "Permission denied.".to_string(),
            404 => "Record not found.".to_string(),
            409 => "Conflict. The record may already exist or be in use.".to_string(),
            429 => "Too many requests. Please try again later.".to_string(),
            500..=599 => "Server temporarily unavailable. Please try again.".to_string(),
            other => format!("Request failed ({}).", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(TransportError::NotFound("clinics/1".into()).is_not_found());
        assert!(TransportError::Status {
            status: 404,
            message: String::new()
        }
        .is_not_found());
        assert!(!TransportError::Timeout(Duration::from_secs(1)).is_not_found());
    }

    #[test]
    fn test_format_hides_backend_details() {
        let err = TransportError::Status {
            status: 500,
            message: "java.lang.NullPointerException at ...".into(),
        };
        let msg = format_transport_error(&err);
        assert!(!msg.contains("NullPointer"));
        assert!(msg.contains("unavailable"));

        let msg = format_transport_error(&TransportError::Status {
            status: 418,
            message: String::new(),
        });
        assert_eq!(msg, "Request failed (418).");
    }
}
