//! reqwest-backed client for the analysis services.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AnalysisBackend, ConvertedUpload, ServiceError};
use crate::models::Detection;

/// Upstream inference can take a while; matches the server's own limit.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct UploadBody {
    file_id: String,
    png_url: String,
}

#[derive(Debug, Deserialize)]
struct PredictBody {
    annotations: Annotations,
}

#[derive(Debug, Deserialize)]
struct Annotations {
    /// The detection service may omit the key entirely when it has
    /// nothing to report.
    #[serde(default)]
    predictions: Vec<Detection>,
}

#[derive(Debug, Deserialize)]
struct ReportBody {
    report: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP client for the conversion, detection, and report services,
/// all reachable under one configurable base URL.
pub struct ServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The conversion service hands back container-relative paths like
    /// `/file/<id>.png`; resolve them against the base URL.
    fn resolve_url(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}{}", self.base_url, location)
        }
    }

    /// Apply the shared error envelope: a non-success status with a
    /// parsable `{"detail": ...}` body becomes `Rejected`, anything else
    /// a `Transport` failure.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(ServiceError::Rejected(body.detail)),
            Err(err) => {
                warn!(%status, %err, "service error without structured body");
                Err(ServiceError::Transport(format!("status {status}")))
            }
        }
    }
}

#[async_trait]
impl AnalysisBackend for ServiceClient {
    async fn convert(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ConvertedUpload, ServiceError> {
        debug!(file_name, size = bytes.len(), "uploading radiograph");
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload/", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let body: UploadBody = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::Malformed(err.to_string()))?;

        Ok(ConvertedUpload {
            file_id: body.file_id,
            preview_url: self.resolve_url(&body.png_url),
        })
    }

    async fn detect(&self, file_id: &str) -> Result<Vec<Detection>, ServiceError> {
        debug!(file_id, "requesting pathology detection");
        let response = self
            .client
            .post(format!("{}/predict/", self.base_url))
            .query(&[("file_id", file_id)])
            .send()
            .await?;
        let body: PredictBody = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::Malformed(err.to_string()))?;
        Ok(body.annotations.predictions)
    }

    async fn generate_report(&self, file_id: &str) -> Result<String, ServiceError> {
        debug!(file_id, "requesting diagnostic report");
        let response = self
            .client
            .post(format!("{}/report/", self.base_url))
            .query(&[("file_id", file_id)])
            .send()
            .await?;
        let body: ReportBody = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::Malformed(err.to_string()))?;
        Ok(body.report)
    }
}
