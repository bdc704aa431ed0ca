use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::preview::{decode_data_url, sniff_mime};
use super::types::{Histogram, ImageFile, ImageId, ImageInfo, OneShot, Preview, Variant};
use super::RemoteProcessor;
use crate::config::RetouchConfig;
use crate::error::RetouchError;
use crate::session::Adjustments;

const USER_AGENT: &str = "Retouch/1.0";

/// Which error variant a failed call maps to when the server answers with
/// something other than 404.
#[derive(Debug, Clone, Copy)]
enum CallKind {
    Upload,
    Process,
}

impl CallKind {
    fn error(self, detail: String) -> RetouchError {
        match self {
            CallKind::Upload => RetouchError::Upload(detail),
            CallKind::Process => RetouchError::Process(detail),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Deserialize)]
struct PreviewBody {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct HistogramBody {
    histogram: Histogram,
}

/// HTTP client for the processing service.
///
/// Wraps a single `reqwest::Client` with the configured timeout; every
/// request goes to a path under `base_url`.
pub struct HttpProcessor {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProcessor {
    /// Build a client for `config.processor_url`.
    pub fn new(config: &RetouchConfig) -> Result<Self, RetouchError> {
        let base_url = normalize_base(&config.processor_url)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RetouchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!("Processor client targeting {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RetouchError> {
        self.base_url
            .join(path)
            .map_err(|e| RetouchError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn image_endpoint(&self, action: &str, id: &ImageId) -> Result<Url, RetouchError> {
        self.endpoint(&format!("{}/{}", action, urlencoding::encode(id.as_str())))
    }

    async fn post_form(
        &self,
        url: Url,
        fields: &[(&str, String)],
    ) -> Result<(), RetouchError> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, CallKind::Process).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteProcessor for HttpProcessor {
    async fn health(&self) -> Result<(), RetouchError> {
        let url = self.endpoint("health")?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RetouchError::Connectivity(format!(
                "Health check returned {}",
                response.status()
            )))
        }
    }

    async fn upload(&self, file: &ImageFile) -> Result<ImageInfo, RetouchError> {
        let mime = sniff_mime(&file.bytes)?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(mime)
            .map_err(|e| RetouchError::Upload(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        let url = self.endpoint("upload")?;
        info!("Uploading {} ({} bytes, {})", file.filename, file.bytes.len(), mime);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, CallKind::Upload).await?;

        response
            .json::<ImageInfo>()
            .await
            .map_err(|e| RetouchError::Upload(format!("Unexpected upload response: {}", e)))
    }

    async fn process(&self, id: &ImageId, adjustments: &Adjustments) -> Result<(), RetouchError> {
        let url = self.image_endpoint("process", id)?;
        self.post_form(
            url,
            &[
                ("brightness", adjustments.brightness.to_string()),
                ("contrast", adjustments.contrast.to_string()),
                ("saturation", adjustments.saturation.to_string()),
            ],
        )
        .await
    }

    async fn apply_one_shot(&self, id: &ImageId, op: &OneShot) -> Result<(), RetouchError> {
        let (url, fields) = match *op {
            OneShot::AutoAdjust => (self.image_endpoint("auto-adjust", id)?, Vec::new()),
            OneShot::Clahe {
                clip_limit,
                tile_grid_size,
            } => (
                self.image_endpoint("clahe", id)?,
                vec![
                    ("clip_limit", clip_limit.to_string()),
                    ("tile_grid_size", tile_grid_size.to_string()),
                ],
            ),
            OneShot::SCurve { intensity } => (
                self.image_endpoint("s-curve", id)?,
                vec![("intensity", intensity.to_string())],
            ),
        };
        self.post_form(url, &fields).await
    }

    async fn fetch_preview(&self, id: &ImageId, variant: Variant) -> Result<Preview, RetouchError> {
        let mut url = self.image_endpoint("preview", id)?;
        url.query_pairs_mut()
            .append_pair("processed", &variant.is_processed().to_string());

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response, CallKind::Process).await?;
        let body: PreviewBody = response
            .json()
            .await
            .map_err(|e| RetouchError::Process(format!("Unexpected preview response: {}", e)))?;

        let fallback = body.mime_type.as_deref().unwrap_or("image/jpeg");
        decode_data_url(&body.data, fallback)
    }

    async fn fetch_histogram(
        &self,
        id: &ImageId,
        variant: Variant,
    ) -> Result<Histogram, RetouchError> {
        let mut url = self.image_endpoint("histogram", id)?;
        url.query_pairs_mut()
            .append_pair("processed", &variant.is_processed().to_string());

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response, CallKind::Process).await?;
        let body: HistogramBody = response
            .json()
            .await
            .map_err(|e| RetouchError::Process(format!("Unexpected histogram response: {}", e)))?;
        Ok(body.histogram)
    }

    async fn download(&self, id: &ImageId, variant: Variant) -> Result<Vec<u8>, RetouchError> {
        let mut url = self.image_endpoint("download", id)?;
        url.query_pairs_mut()
            .append_pair("processed", &variant.is_processed().to_string());

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response, CallKind::Process).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RetouchError::Process(format!("Failed to read download body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, id: &ImageId) -> Result<(), RetouchError> {
        let url = self.image_endpoint("delete", id)?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, CallKind::Process).await?;
        Ok(())
    }
}

/// Make sure the base URL ends in `/` so `join` appends instead of replacing
/// the last path segment.
fn normalize_base(raw: &str) -> Result<Url, RetouchError> {
    let mut url = Url::parse(raw)
        .map_err(|e| RetouchError::Config(format!("Invalid processor URL '{}': {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn transport_error(e: reqwest::Error) -> RetouchError {
    if e.is_connect() || e.is_timeout() {
        RetouchError::Connectivity(e.to_string())
    } else {
        RetouchError::Process(e.to_string())
    }
}

async fn check_status(response: Response, kind: CallKind) -> Result<Response, RetouchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(status, &body);
    warn!("Processor returned {}: {}", status.as_u16(), detail);

    if status == StatusCode::NOT_FOUND {
        Err(RetouchError::NotFound(detail))
    } else {
        Err(kind.error(detail))
    }
}

/// Pull `detail` out of an error body, falling back to the status line.
fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}
