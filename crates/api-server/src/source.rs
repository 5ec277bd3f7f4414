//! Share-link metadata probe
//!
//! Every submitted link is checked against the source metadata API before
//! a task is accepted, so broken or unusable links are rejected at intake
//! instead of surfacing as a failed download later.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Fields requested from the metadata endpoint.
const METADATA_FIELDS: &str = "name,size,mime_type,type,file,media_type";

const BYTES_PER_MB: i64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("The shared video was not found")]
    NotFound,

    #[error("Access to the shared video is denied")]
    AccessDenied,

    /// The link resolves, but the resource behind it is unusable.
    #[error("{0}")]
    Rejected(String),

    #[error("The source service responded with status {0}")]
    Status(u16),

    #[error("Could not reach the source service: {0}")]
    Http(#[from] reqwest::Error),
}

/// What the metadata probe learned about a usable shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedFile {
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub download_url: String,
}

#[async_trait::async_trait]
pub trait SourceProbe: Send + Sync {
    /// Resolve a public share link to a directly downloadable file.
    async fn probe(&self, share_url: &str) -> Result<ProbedFile, SourceError>;
}

/// Raw metadata document returned by the source API.
#[derive(Debug, Deserialize)]
struct ResourceMetadata {
    #[serde(default)]
    name: String,

    #[serde(default)]
    size: i64,

    #[serde(default)]
    mime_type: String,

    #[serde(default, rename = "type")]
    resource_type: String,

    /// Direct download href; absent when the owner restricted downloads.
    #[serde(default)]
    file: Option<String>,

    #[serde(default)]
    media_type: String,
}

/// Validate the probed resource and distill it into a [`ProbedFile`].
fn analyze_metadata(metadata: ResourceMetadata, max_file_bytes: i64) -> Result<ProbedFile, SourceError> {
    if metadata.resource_type == "dir" {
        return Err(SourceError::Rejected(
            "The share link points to a directory, not a video file".to_string(),
        ));
    }
    if metadata.resource_type != "file" {
        return Err(SourceError::Rejected(format!(
            "The share link points to a {} resource, not a file",
            metadata.resource_type
        )));
    }

    let download_url = match metadata.file {
        Some(href) if !href.is_empty() => href,
        _ => {
            return Err(SourceError::Rejected(
                "The shared file does not expose a download link".to_string(),
            ))
        }
    };

    if metadata.size <= 0 {
        return Err(SourceError::Rejected(
            "Could not determine the size of the shared file".to_string(),
        ));
    }
    if metadata.size > max_file_bytes {
        return Err(SourceError::Rejected(format!(
            "The file is {} MB, the supported maximum is {} MB",
            metadata.size / BYTES_PER_MB,
            max_file_bytes / BYTES_PER_MB
        )));
    }

    if !looks_like_video(&metadata.mime_type, &metadata.media_type) {
        warn!(
            "File {:?} may not be a video (mime type {:?}, media type {:?})",
            metadata.name, metadata.mime_type, metadata.media_type
        );
    }

    Ok(ProbedFile {
        file_name: metadata.name,
        file_size: metadata.size,
        mime_type: metadata.mime_type,
        download_url,
    })
}

fn looks_like_video(mime_type: &str, media_type: &str) -> bool {
    let video_mime = mime_type.starts_with("video/")
        || mime_type == "application/x-mpegURL"
        || mime_type == "application/vnd.apple.mpegurl";
    video_mime || media_type == "video" || media_type == "audio"
}

/// HTTP client for the source metadata API.
pub struct SourceClient {
    http: reqwest::Client,
    endpoint: String,
    max_file_bytes: i64,
}

impl SourceClient {
    pub fn new(endpoint: String, max_file_bytes: i64) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint,
            max_file_bytes,
        })
    }
}

#[async_trait::async_trait]
impl SourceProbe for SourceClient {
    async fn probe(&self, share_url: &str) -> Result<ProbedFile, SourceError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("public_key", share_url), ("fields", METADATA_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            404 => return Err(SourceError::NotFound),
            403 => return Err(SourceError::AccessDenied),
            code if !status.is_success() => return Err(SourceError::Status(code)),
            _ => {}
        }

        let metadata: ResourceMetadata = response.json().await?;
        analyze_metadata(metadata, self.max_file_bytes)
    }
}
