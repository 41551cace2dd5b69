//! preview: generate component previews for a single project, in-process.
//!
//! Prints the path of every image as soon as it is written, one per line on
//! stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use preview_core::job::JobState;
use preview_core::project::ProjectSource;
use preview_events::{EventBus, JobEventKind};
use preview_pipeline::{JobEngine, PipelineConfig};
use preview_stages::StageConfig;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "preview", version, about = "Generate component preview images for a project")]
struct Cli {
    /// Project URL; its last path segment is the app id
    #[arg(short, long, env = "PREVIEW_PROJECT_URL")]
    url: String,

    /// Directory receiving the generated files (overrides RESULTS_DIR)
    #[arg(long)]
    results_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "preview_cli=info,preview_pipeline=info,preview_stages=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let source = ProjectSource::parse(&cli.url).context("invalid project URL")?;

    let mut pipeline = PipelineConfig::from_env();
    if let Some(dir) = cli.results_dir {
        pipeline.results_dir = dir;
    }

    // Subscribe before submitting so no event is missed.
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let engine = JobEngine::new(
        preview_stages::stage_set(&StageConfig::from_env()),
        pipeline,
        bus,
    );

    let submission = engine.submit(source);
    let key = submission.job.key().clone();
    let runner = submission
        .runner
        .context("job was registered but no runner started")?;

    loop {
        match events.recv().await {
            Ok(event) if event.job_key == key => {
                if let JobEventKind::ArtifactReady { artifact, .. } = &event.kind {
                    println!("{}", artifact.path.display());
                }
                if event.is_final() {
                    break;
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed progress events");
            }
            Err(RecvError::Closed) => break,
        }
    }

    let state = runner.await.context("job runner crashed")?;
    let job = engine
        .status(&key)
        .context("job disappeared from the registry")?;

    if state == JobState::Error {
        bail!(
            "generation failed for '{key}': {}",
            job.error().unwrap_or("unknown error")
        );
    }

    tracing::info!(
        job_key = %key,
        produced = job.artifacts().len(),
        expected = job.expected_count().unwrap_or_default(),
        "Done",
    );
    Ok(())
}
