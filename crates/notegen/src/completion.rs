//! Markdown note generation via the text completion service

use crate::{NotegenError, NotegenResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 4000;

const SYSTEM_PROMPT: &str =
    "You are a professional teacher who produces high-quality study materials and lecture notes.";

/// Endpoint, model and credentials for the completion service
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub completion_url: String,
    /// Model identifier passed through verbatim in the request body
    pub model_uri: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<CompletionAlternative>,
}

#[derive(Debug, Deserialize)]
struct CompletionAlternative {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    text: String,
}

/// Instructional prompt embedding the transcript and the lecture title
#[must_use]
pub fn note_prompt(lecture_title: &str, transcript: &str) -> String {
    format!(
        "Create notes for the lecture \"{lecture_title}\" based on the text below.\n\
         \n\
         Lecture text:\n\
         {transcript}\n\
         \n\
         Markdown format:\n\
         # {lecture_title}\n\
         - Main ideas\n\
         - Key terms\n\
         - Conclusions\n\
         \n\
         Be brief."
    )
}

fn first_alternative(response: CompletionResponse) -> NotegenResult<String> {
    response
        .result
        .alternatives
        .into_iter()
        .next()
        .map(|alternative| alternative.message.text)
        .ok_or(NotegenError::EmptyCompletion)
}

/// Turns a lecture transcript into markdown notes
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, lecture_title: &str, transcript: &str) -> NotegenResult<String>;
}

/// Completion service client backed by `reqwest`
pub struct HttpSummarizer {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl HttpSummarizer {
    pub fn new(config: CompletionConfig) -> NotegenResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, lecture_title: &str, transcript: &str) -> NotegenResult<String> {
        let prompt = note_prompt(lecture_title, transcript);
        let request = CompletionRequest {
            model_uri: &self.config.model_uri,
            completion_options: CompletionOptions {
                stream: false,
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            },
            messages: vec![
                Message {
                    role: "system",
                    text: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    text: &prompt,
                },
            ],
        };

        let response = self
            .http
            .post(&self.config.completion_url)
            .header("Authorization", format!("Api-Key {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotegenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        let note = first_alternative(parsed)?;
        tracing::debug!(
            "Generated {} markdown characters for \"{}\"",
            note.len(),
            lecture_title
        );
        Ok(note)
    }
}
