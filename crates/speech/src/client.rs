//! HTTP client for the speech recognition service
//!
//! Recognition is asynchronous: a submit call starts an operation, the
//! operation endpoint reports completion, and the result endpoint streams
//! newline-delimited recognition records once the operation is done.

use crate::transcript::{parse_recognition_lines, TranscriptFragment};
use crate::{OperationStatus, SpeechError, SpeechResult, Transcriber};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RECOGNITION_MODEL: &str = "general";
const CONTAINER_AUDIO_TYPE: &str = "MP3";

/// Endpoints and credentials for the recognition service
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// POST endpoint that starts a recognition operation
    pub submit_url: String,
    /// GET endpoint for operation status; the operation id is appended as a path segment
    pub operation_url: String,
    /// GET endpoint for recognition results, queried by `operationId`
    pub result_url: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    uri: &'a str,
    recognition_model: RecognitionModel,
}

#[derive(Debug, Serialize)]
struct RecognitionModel {
    model: &'static str,
    audio_format: AudioFormat,
}

#[derive(Debug, Serialize)]
struct AudioFormat {
    container_audio: ContainerAudio,
}

#[derive(Debug, Serialize)]
struct ContainerAudio {
    container_audio_type: &'static str,
}

impl<'a> SubmitRequest<'a> {
    fn mp3(uri: &'a str) -> Self {
        Self {
            uri,
            recognition_model: RecognitionModel {
                model: RECOGNITION_MODEL,
                audio_format: AudioFormat {
                    container_audio: ContainerAudio {
                        container_audio_type: CONTAINER_AUDIO_TYPE,
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

fn operation_status(response: OperationResponse) -> OperationStatus {
    if !response.done {
        return OperationStatus::Running;
    }
    match response.error {
        Some(error) => {
            let message = if error.message.is_empty() {
                "recognition failed".to_string()
            } else {
                error.message
            };
            OperationStatus::Failed { message }
        }
        None => OperationStatus::Done,
    }
}

/// Speech service client backed by `reqwest`
pub struct HttpTranscriber {
    http: reqwest::Client,
    config: SpeechConfig,
}

impl HttpTranscriber {
    pub fn new(config: SpeechConfig) -> SpeechResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    fn auth_header(&self) -> String {
        format!("Api-Key {}", self.config.api_key)
    }

    async fn read_body(response: reqwest::Response) -> SpeechResult<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Transcriber for HttpTranscriber {
    async fn submit(&self, audio_url: &str) -> SpeechResult<String> {
        let response = self
            .http
            .post(&self.config.submit_url)
            .header("Authorization", self.auth_header())
            .json(&SubmitRequest::mp3(audio_url))
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let submitted: SubmitResponse = serde_json::from_str(&body)?;
        tracing::debug!("Recognition operation {} started", submitted.id);
        Ok(submitted.id)
    }

    async fn status(&self, operation_id: &str) -> SpeechResult<OperationStatus> {
        let url = format!(
            "{}/{}",
            self.config.operation_url.trim_end_matches('/'),
            operation_id
        );
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let operation: OperationResponse = serde_json::from_str(&body)?;
        Ok(operation_status(operation))
    }

    async fn fetch_result(&self, operation_id: &str) -> SpeechResult<Vec<TranscriptFragment>> {
        let response = self
            .http
            .get(&self.config.result_url)
            .header("Authorization", self.auth_header())
            .query(&[("operationId", operation_id)])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        parse_recognition_lines(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_shape() {
        let request = SubmitRequest::mp3("https://storage.local/audios/task-1.mp3");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "uri": "https://storage.local/audios/task-1.mp3",
                "recognition_model": {
                    "model": "general",
                    "audio_format": {
                        "container_audio": {
                            "container_audio_type": "MP3"
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_operation_status_running_until_done() {
        let response: OperationResponse = serde_json::from_str(r#"{"id":"op-1","done":false}"#).unwrap();
        assert_eq!(operation_status(response), OperationStatus::Running);

        let response: OperationResponse = serde_json::from_str(r#"{"id":"op-1"}"#).unwrap();
        assert_eq!(operation_status(response), OperationStatus::Running);
    }

    #[test]
    fn test_operation_status_done() {
        let response: OperationResponse = serde_json::from_str(r#"{"id":"op-1","done":true}"#).unwrap();
        assert_eq!(operation_status(response), OperationStatus::Done);
    }

    #[test]
    fn test_operation_status_failed_carries_message() {
        let response: OperationResponse =
            serde_json::from_str(r#"{"done":true,"error":{"message":"audio too short"}}"#).unwrap();
        assert_eq!(
            operation_status(response),
            OperationStatus::Failed {
                message: "audio too short".to_string()
            }
        );
    }

    #[test]
    fn test_operation_status_failed_without_message() {
        let response: OperationResponse =
            serde_json::from_str(r#"{"done":true,"error":{}}"#).unwrap();
        assert_eq!(
            operation_status(response),
            OperationStatus::Failed {
                message: "recognition failed".to_string()
            }
        );
    }
}
