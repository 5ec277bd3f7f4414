//! Object storage implementation using S3/MinIO
//!
//! Artifact keys are derived from the task id, so a retried stage overwrites
//! its earlier output instead of leaving orphaned objects behind. Each object
//! carries a retention tag that bucket lifecycle rules act on: intermediate
//! artifacts expire, final notes are kept.

use crate::{StorageError, StorageResult};
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// Uploads at or above this many bytes go through the multipart path
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Part size for multipart uploads
pub const DEFAULT_PART_SIZE: u64 = 10 * 1024 * 1024;

/// Artifact produced by a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Source video staged by the downloader
    Video,

    /// MP3 track produced by the audio extractor
    Audio,

    /// Plain-text transcript assembled from recognition results
    Transcript,

    /// Rendered PDF lecture note
    Note,
}

impl ArtifactKind {
    /// Object key for this artifact of the given task
    #[must_use]
    pub fn key(self, task_id: &str) -> String {
        match self {
            ArtifactKind::Video => format!("videos/{task_id}.mp4"),
            ArtifactKind::Audio => format!("audios/{task_id}.mp3"),
            ArtifactKind::Transcript => format!("transcripts/{task_id}.txt"),
            ArtifactKind::Note => format!("notes/{task_id}.pdf"),
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Video => "video/mp4",
            ArtifactKind::Audio => "audio/mpeg",
            ArtifactKind::Transcript => "text/plain; charset=utf-8",
            ArtifactKind::Note => "application/pdf",
        }
    }

    /// Object tag that bucket lifecycle rules match on
    #[must_use]
    pub fn retention_tag(self) -> &'static str {
        match self {
            ArtifactKind::Note => "retention=archive",
            _ => "retention=transient",
        }
    }

    /// Content disposition for artifacts served to browsers
    #[must_use]
    pub fn content_disposition(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Transcript | ArtifactKind::Note => Some("inline"),
            ArtifactKind::Video | ArtifactKind::Audio => None,
        }
    }
}

/// S3/MinIO configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// AWS region (e.g., "us-west-2") or "us-east-1" for `MinIO`
    pub region: String,

    /// S3 endpoint (custom for `MinIO`, `None` for AWS S3)
    pub endpoint: Option<String>,

    /// AWS access key ID
    pub access_key_id: String,

    /// AWS secret access key
    pub secret_access_key: String,

    /// Base URL under which objects in the bucket are addressable
    pub public_base_url: String,

    /// Uploads at or above this many bytes use the multipart path
    pub multipart_threshold: u64,

    /// Part size in bytes for multipart uploads
    pub part_size: u64,
}

/// Object storage trait
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an artifact from bytes, returning its storage URL
    async fn put(&self, kind: ArtifactKind, task_id: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Store an artifact from a local file, returning its storage URL
    async fn put_file(
        &self,
        kind: ArtifactKind,
        task_id: &str,
        path: &Path,
    ) -> StorageResult<String>;

    /// Retrieve an artifact as bytes
    async fn get(&self, storage_url: &str) -> StorageResult<Vec<u8>>;

    /// Retrieve an artifact and save it to a local path
    async fn get_to_path(&self, storage_url: &str, path: &Path) -> StorageResult<()>;

    /// Produce a time-limited download link for an artifact
    async fn presign_get(&self, storage_url: &str, expires_in: Duration) -> StorageResult<String>;
}

/// S3/MinIO object store implementation
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
    multipart_threshold: u64,
    part_size: u64,
}

impl S3ObjectStore {
    /// Create a new S3 object store client
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "lecture-notes-storage",
        );

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(region)
            .behavior_version_latest();

        // Set custom endpoint for MinIO
        if let Some(endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            // S3 rejects parts under 5 MiB except the last one
            part_size: config.part_size.max(5 * 1024 * 1024),
            multipart_threshold: config.multipart_threshold,
        })
    }

    /// Public URL for an object key
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Object key addressed by a storage URL
    fn key_from_url(&self, storage_url: &str) -> StorageResult<String> {
        storage_url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(std::string::ToString::to_string)
            .ok_or_else(|| StorageError::InvalidUrl(storage_url.to_string()))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, kind: ArtifactKind, task_id: &str, data: Vec<u8>) -> StorageResult<String> {
        let key = kind.key(task_id);
        let byte_stream = ByteStream::from(data);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(kind.content_type())
            .tagging(kind.retention_tag())
            .body(byte_stream);

        if let Some(disposition) = kind.content_disposition() {
            request = request.content_disposition(disposition);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(self.url_for(&key))
    }

    async fn put_file(
        &self,
        kind: ArtifactKind,
        task_id: &str,
        path: &Path,
    ) -> StorageResult<String> {
        let size = tokio::fs::metadata(path).await?.len();

        if size < self.multipart_threshold {
            let data = tokio::fs::read(path).await?;
            return self.put(kind, task_id, data).await;
        }

        let key = kind.key(task_id);
        info!("Uploading {} ({} bytes) via multipart", key, size);
        run_multipart_upload(self, kind, &key, path, self.part_size).await?;

        Ok(self.url_for(&key))
    }

    async fn get(&self, storage_url: &str) -> StorageResult<Vec<u8>> {
        let key = self.key_from_url(storage_url)?;

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::NotFound(key.clone())
                } else {
                    StorageError::S3Error(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn get_to_path(&self, storage_url: &str, path: &Path) -> StorageResult<()> {
        let data = self.get(storage_url).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn presign_get(&self, storage_url: &str, expires_in: Duration) -> StorageResult<String> {
        let key = self.key_from_url(storage_url)?;

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

/// Minimal surface of the S3 multipart API, split out so the upload loop can
/// be exercised without a live bucket
#[async_trait::async_trait]
trait MultipartTransport {
    async fn begin(&self, kind: ArtifactKind, key: &str) -> StorageResult<String>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> StorageResult<CompletedPartInfo>;

    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPartInfo>,
    ) -> StorageResult<()>;

    async fn abort(&self, key: &str, upload_id: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompletedPartInfo {
    part_number: i32,
    e_tag: String,
}

/// Drive a multipart upload from a local file, aborting the upload when any
/// part or the final assembly fails
async fn run_multipart_upload<T: MultipartTransport>(
    transport: &T,
    kind: ArtifactKind,
    key: &str,
    path: &Path,
    part_size: u64,
) -> StorageResult<()> {
    let upload_id = transport.begin(kind, key).await?;

    let outcome = match upload_parts(transport, key, &upload_id, path, part_size).await {
        Ok(parts) => transport.complete(key, &upload_id, parts).await,
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        if let Err(abort_err) = transport.abort(key, &upload_id).await {
            warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
        }
        return Err(e);
    }

    Ok(())
}

async fn upload_parts<T: MultipartTransport>(
    transport: &T,
    key: &str,
    upload_id: &str,
    path: &Path,
    part_size: u64,
) -> StorageResult<Vec<CompletedPartInfo>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut parts = Vec::new();
    let mut part_number = 1i32;

    loop {
        let mut buffer = vec![0u8; part_size as usize];
        let mut filled = 0usize;

        while filled < buffer.len() {
            let read = file.read(&mut buffer[filled..]).await?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        if filled == 0 {
            break;
        }

        buffer.truncate(filled);
        let part = transport
            .upload_part(key, upload_id, part_number, buffer)
            .await?;
        parts.push(part);
        part_number += 1;
    }

    Ok(parts)
}

#[async_trait::async_trait]
impl MultipartTransport for S3ObjectStore {
    async fn begin(&self, kind: ArtifactKind, key: &str) -> StorageResult<String> {
        let mut request = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(kind.content_type())
            .tagging(kind.retention_tag());

        if let Some(disposition) = kind.content_disposition() {
            request = request.content_disposition(disposition);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        response
            .upload_id()
            .map(std::string::ToString::to_string)
            .ok_or_else(|| StorageError::S3Error("multipart upload has no upload id".to_string()))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> StorageResult<CompletedPartInfo> {
        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        let e_tag = response
            .e_tag()
            .map(std::string::ToString::to_string)
            .ok_or_else(|| StorageError::S3Error(format!("part {part_number} has no etag")))?;

        Ok(CompletedPartInfo { part_number, e_tag })
    }

    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPartInfo>,
    ) -> StorageResult<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.e_tag)
                    .build()
            })
            .collect();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(())
    }

    async fn abort(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?;

        Ok(())
    }
}

/// In-memory object store used by handler and pipeline tests
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: tokio::sync::Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    const BASE_URL: &'static str = "memory://lecture-notes";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn url_for(key: &str) -> String {
        format!("{}/{}", Self::BASE_URL, key)
    }

    fn key_from_url(storage_url: &str) -> StorageResult<String> {
        storage_url
            .strip_prefix(Self::BASE_URL)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(std::string::ToString::to_string)
            .ok_or_else(|| StorageError::InvalidUrl(storage_url.to_string()))
    }

    /// Stored bytes for an artifact, if present
    pub async fn object(&self, kind: ArtifactKind, task_id: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().await;
        objects.get(&kind.key(task_id)).cloned()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, kind: ArtifactKind, task_id: &str, data: Vec<u8>) -> StorageResult<String> {
        let key = kind.key(task_id);
        let mut objects = self.objects.lock().await;
        objects.insert(key.clone(), data);
        Ok(Self::url_for(&key))
    }

    async fn put_file(
        &self,
        kind: ArtifactKind,
        task_id: &str,
        path: &Path,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(path).await?;
        self.put(kind, task_id, data).await
    }

    async fn get(&self, storage_url: &str) -> StorageResult<Vec<u8>> {
        let key = Self::key_from_url(storage_url)?;
        let objects = self.objects.lock().await;
        objects
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound(key))
    }

    async fn get_to_path(&self, storage_url: &str, path: &Path) -> StorageResult<()> {
        let data = self.get(storage_url).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn presign_get(&self, storage_url: &str, expires_in: Duration) -> StorageResult<String> {
        let key = Self::key_from_url(storage_url)?;
        Ok(format!(
            "{}?X-Expires={}&X-Signature=memory",
            Self::url_for(&key),
            expires_in.as_secs()
        ))
    }
}
