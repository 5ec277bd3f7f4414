//! Worker configuration loaded from the environment.
//!
//! Every variable is read up front and all problems are reported in a
//! single error, so a misconfigured worker fails at startup instead of
//! on its first message.

use std::time::Duration;

use lecture_notes_common::{ConfigError, EnvReader};
use lecture_notes_notegen::CompletionConfig;
use lecture_notes_queue::SqsConfig;
use lecture_notes_speech::SpeechConfig;
use lecture_notes_storage::{
    PostgresConfig, S3Config, DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE,
};

const DEFAULT_MAX_VIDEO_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;
const DEFAULT_VISIBILITY_TIMEOUT_SECS: u32 = 300;

/// Full configuration for the pipeline worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub s3: S3Config,
    pub postgres: PostgresConfig,
    pub sqs: SqsConfig,
    pub speech: SpeechConfig,
    pub completion: CompletionConfig,

    /// Largest video the downloader will accept, in bytes.
    pub max_video_bytes: u64,

    /// Lifetime of presigned links handed to external services.
    pub presign_expiry: Duration,

    /// Status checks before a recognition operation is abandoned.
    pub max_poll_attempts: u32,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut reader = EnvReader::new();

        let region = reader.optional("AWS_REGION", "us-east-1");
        let access_key_id = reader.require("AWS_ACCESS_KEY_ID");
        let secret_access_key = reader.require("AWS_SECRET_ACCESS_KEY");

        let s3 = S3Config {
            bucket: reader.require("STORAGE_BUCKET"),
            region: region.clone(),
            endpoint: optional_endpoint(&mut reader, "STORAGE_ENDPOINT"),
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            public_base_url: reader.require("STORAGE_PUBLIC_BASE_URL"),
            multipart_threshold: reader
                .parsed("MULTIPART_THRESHOLD_BYTES", DEFAULT_MULTIPART_THRESHOLD),
            part_size: reader.parsed("MULTIPART_PART_SIZE_BYTES", DEFAULT_PART_SIZE),
        };

        let postgres = PostgresConfig {
            host: reader.require("POSTGRES_HOST"),
            port: reader.parsed("POSTGRES_PORT", 5432),
            database: reader.require("POSTGRES_DATABASE"),
            user: reader.require("POSTGRES_USER"),
            password: reader.require("POSTGRES_PASSWORD"),
        };

        let sqs = SqsConfig {
            queue_url: reader.require("QUEUE_URL"),
            region,
            endpoint: optional_endpoint(&mut reader, "QUEUE_ENDPOINT"),
            access_key_id,
            secret_access_key,
            visibility_timeout: reader
                .parsed("QUEUE_VISIBILITY_TIMEOUT", DEFAULT_VISIBILITY_TIMEOUT_SECS),
        };

        let speech = SpeechConfig {
            submit_url: reader.require("SPEECH_API_URL"),
            operation_url: reader.require("SPEECH_OPERATION_URL"),
            result_url: reader.require("SPEECH_RESULT_URL"),
            api_key: reader.require("SPEECH_API_KEY"),
        };

        let completion = CompletionConfig {
            completion_url: reader.require("COMPLETION_API_URL"),
            model_uri: reader.require("COMPLETION_MODEL_URI"),
            api_key: reader.require("COMPLETION_API_KEY"),
        };

        let max_video_bytes = reader.parsed("MAX_VIDEO_SIZE_BYTES", DEFAULT_MAX_VIDEO_BYTES);
        let presign_expiry = Duration::from_secs(
            reader.parsed("PRESIGN_EXPIRY_SECS", DEFAULT_PRESIGN_EXPIRY_SECS),
        );
        let max_poll_attempts = reader.parsed("MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS);

        reader.finish()?;
        Ok(Self {
            s3,
            postgres,
            sqs,
            speech,
            completion,
            max_video_bytes,
            presign_expiry,
            max_poll_attempts,
        })
    }
}

/// Read an endpoint override, treating an absent or blank value as none.
fn optional_endpoint(reader: &mut EnvReader, name: &str) -> Option<String> {
    let value = reader.optional(name, "");
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
