//! Audio track extraction via the ffmpeg CLI

use std::ffi::OsString;
use std::path::Path;

use thiserror::Error;

const MP3_BITRATE: &str = "192k";
const MP3_SAMPLE_RATE: &str = "44100";

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to execute ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
}

/// Demuxes and compresses the audio track of a stored video
#[async_trait::async_trait]
pub trait AudioTranscoder: Send + Sync {
    async fn extract_mp3(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Transcoder shelling out to the `ffmpeg` binary on `PATH`
pub struct FfmpegTranscoder;

fn mp3_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-vn".into(),
        "-acodec".into(),
        "libmp3lame".into(),
        "-b:a".into(),
        MP3_BITRATE.into(),
        "-ar".into(),
        MP3_SAMPLE_RATE.into(),
        "-y".into(),
        output.into(),
    ]
}

#[async_trait::async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn extract_mp3(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let result = tokio::process::Command::new("ffmpeg")
            .args(mp3_args(input, output))
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Ffmpeg(stderr.trim().to_string()));
        }

        if !output.exists() {
            return Err(TranscodeError::Ffmpeg(
                "output file was not created".to_string(),
            ));
        }

        Ok(())
    }
}
