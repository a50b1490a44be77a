//! Contracts for the three remote collaborators: the DICOM conversion
//! service, the pathology detection service, and the report generator.
//!
//! All three share one envelope convention: a non-success response may
//! carry a JSON body with a `detail` field meant verbatim for the user.
//! The [`AnalysisBackend`] trait is the seam between the workflow
//! controller and the transport; tests substitute a mock, production
//! uses [`http::ServiceClient`].

pub mod http;

use async_trait::async_trait;

use crate::models::Detection;

/// Errors from remote service calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The service rejected the request with a structured `detail`
    /// message; shown to the user verbatim.
    #[error("{0}")]
    Rejected(String),
    /// The request never completed: unreachable host, timeout, or a
    /// non-success status without a parsable error body.
    #[error("request failed: {0}")]
    Transport(String),
    /// Success status but a body we could not make sense of.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Service-supplied message, if there is one to surface verbatim.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Rejected(detail) => Some(detail),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

/// Result of a successful upload to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedUpload {
    pub file_id: String,
    /// Absolute locator for the rendered preview image.
    pub preview_url: String,
}

/// The three remote operations the workflow sequences.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Send radiograph bytes to the conversion service.
    async fn convert(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ConvertedUpload, ServiceError>;

    /// Request pathology detections for a previously converted file.
    async fn detect(&self, file_id: &str) -> Result<Vec<Detection>, ServiceError>;

    /// Request generated diagnostic report text for a converted file.
    async fn generate_report(&self, file_id: &str) -> Result<String, ServiceError>;
}
