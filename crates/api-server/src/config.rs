//! API server configuration loaded from the environment.
//!
//! Shares variable names with the worker so one deployment environment
//! configures both services.

use std::time::Duration;

use lecture_notes_common::{ConfigError, EnvReader};
use lecture_notes_queue::SqsConfig;
use lecture_notes_storage::{
    PostgresConfig, S3Config, DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_VIDEO_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;
const DEFAULT_VISIBILITY_TIMEOUT_SECS: u32 = 300;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub s3: S3Config,
    pub postgres: PostgresConfig,
    pub sqs: SqsConfig,

    /// Source metadata API endpoint used to probe share links.
    pub source_api_url: String,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Largest video intake will accept, in bytes.
    pub max_video_bytes: u64,

    /// Lifetime of presigned note links served by `GET /tasks`.
    pub presign_expiry: Duration,
}

impl ApiConfig {
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

        let source_api_url = reader.require("SOURCE_API_URL");
        let bind_addr = reader.optional("API_SERVER_ADDR", DEFAULT_BIND_ADDR);
        let max_video_bytes = reader.parsed("MAX_VIDEO_SIZE_BYTES", DEFAULT_MAX_VIDEO_BYTES);
        let presign_expiry = Duration::from_secs(
            reader.parsed("PRESIGN_EXPIRY_SECS", DEFAULT_PRESIGN_EXPIRY_SECS),
        );

        reader.finish()?;
        Ok(Self {
            s3,
            postgres,
            sqs,
            source_api_url,
            bind_addr,
            max_video_bytes,
            presign_expiry,
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

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    // Environment variables are process-global, so these tests serialize.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const REQUIRED: &[(&str, &str)] = &[
        ("AWS_ACCESS_KEY_ID", "test-access-key"),
        ("AWS_SECRET_ACCESS_KEY", "test-secret-key"),
        ("STORAGE_BUCKET", "lecture-notes"),
        ("STORAGE_PUBLIC_BASE_URL", "https://storage.example/lecture-notes"),
        ("POSTGRES_HOST", "localhost"),
        ("POSTGRES_DATABASE", "lecture_notes"),
        ("POSTGRES_USER", "postgres"),
        ("POSTGRES_PASSWORD", "postgres"),
        ("QUEUE_URL", "https://queue.example/000/lecture-notes"),
        ("SOURCE_API_URL", "https://source.example/v1/public/resources"),
    ];

    const OPTIONAL: &[&str] = &[
        "AWS_REGION",
        "STORAGE_ENDPOINT",
        "QUEUE_ENDPOINT",
        "MULTIPART_THRESHOLD_BYTES",
        "MULTIPART_PART_SIZE_BYTES",
        "POSTGRES_PORT",
        "QUEUE_VISIBILITY_TIMEOUT",
        "MAX_VIDEO_SIZE_BYTES",
        "PRESIGN_EXPIRY_SECS",
        "API_SERVER_ADDR",
    ];

    fn clear_env() {
        for (name, _) in REQUIRED {
            std::env::remove_var(name);
        }
        for name in OPTIONAL {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_from_env_with_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        for (name, value) in REQUIRED {
            std::env::set_var(name, value);
        }

        let config = ApiConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(
            config.source_api_url,
            "https://source.example/v1/public/resources"
        );
        assert_eq!(config.max_video_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.presign_expiry, Duration::from_secs(3600));
    }

    #[test]
    fn test_from_env_reports_every_missing_variable() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let err = ApiConfig::from_env().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("STORAGE_BUCKET is not set"));
        assert!(text.contains("QUEUE_URL is not set"));
        assert!(text.contains("SOURCE_API_URL is not set"));
    }

    #[test]
    fn test_from_env_honors_bind_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        for (name, value) in REQUIRED {
            std::env::set_var(name, value);
        }
        std::env::set_var("API_SERVER_ADDR", "127.0.0.1:9999");

        let config = ApiConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.bind_addr, "127.0.0.1:9999");
    }
}
