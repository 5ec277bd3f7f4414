//! Pipeline Worker Binary Entry Point

use std::sync::Arc;

use lecture_notes_notegen::{HttpSummarizer, MarkdownPdfRenderer, NoteRenderer, Summarizer};
use lecture_notes_pipeline::{
    AudioTranscoder, CheckRecognitionStage, Dispatcher, DownloadStage, ExtractAudioStage,
    FfmpegTranscoder, GenerateNoteStage, Stages, SubmitRecognitionStage, Worker, WorkerConfig,
};
use lecture_notes_queue::{SqsQueue, TaskQueue};
use lecture_notes_speech::{HttpTranscriber, Transcriber};
use lecture_notes_storage::{ObjectStore, PostgresTaskStore, S3ObjectStore, TaskStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecture_notes_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;

    let objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(config.s3.clone()).await?);
    let tasks: Arc<dyn TaskStore> =
        Arc::new(PostgresTaskStore::new(config.postgres.clone()).await?);
    tasks.init_schema().await?;
    let queue: Arc<dyn TaskQueue> = Arc::new(SqsQueue::new(config.sqs.clone()).await?);

    let transcriber: Arc<dyn Transcriber> = Arc::new(HttpTranscriber::new(config.speech.clone())?);
    let summarizer: Arc<dyn Summarizer> =
        Arc::new(HttpSummarizer::new(config.completion.clone())?);
    let renderer: Arc<dyn NoteRenderer> = Arc::new(MarkdownPdfRenderer::new());
    let transcoder: Arc<dyn AudioTranscoder> = Arc::new(FfmpegTranscoder);

    let stages = Stages {
        download: DownloadStage::new(objects.clone(), tasks.clone(), config.max_video_bytes)?,
        extract_audio: ExtractAudioStage::new(objects.clone(), transcoder),
        submit: SubmitRecognitionStage::new(
            objects.clone(),
            transcriber.clone(),
            config.presign_expiry,
        ),
        check: CheckRecognitionStage::new(objects.clone(), transcriber, config.max_poll_attempts),
        generate_note: GenerateNoteStage::new(objects, tasks.clone(), summarizer, renderer),
    };

    let dispatcher = Dispatcher::new(queue.clone(), tasks, stages);
    let worker = Worker::new(queue, dispatcher);

    tracing::info!("Starting lecture notes pipeline worker");
    tokio::select! {
        () = worker.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
