use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use phytoscan::client::HttpDetectTransport;
use phytoscan::controller::{SubmissionOutcome, UploadController};
use phytoscan::models::SubmissionInput;
use phytoscan::view::TerminalSurface;

/// Submit a video to a PHYTOSCAN gateway and print the detected diseases.
#[derive(Debug, Parser)]
#[command(name = "detect", version, about)]
struct Args {
    /// Path to the video file to analyze
    #[arg(long)]
    video: Option<PathBuf>,

    /// Plant type shown in the video (e.g. tomato)
    #[arg(long)]
    plant_type: Option<String>,

    /// Base URL of the PHYTOSCAN gateway
    #[arg(long, default_value = "http://127.0.0.1:8082")]
    server: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        )
        .init();

    let args = Args::parse();

    let controller = UploadController::new(HttpDetectTransport::new(&args.server));
    let mut surface = TerminalSurface::new();

    let outcome = controller
        .submit(
            SubmissionInput {
                video: args.video,
                plant_type: args.plant_type,
            },
            &mut surface,
        )
        .await;

    match outcome {
        SubmissionOutcome::Completed { .. } => ExitCode::SUCCESS,
        SubmissionOutcome::Stale => ExitCode::SUCCESS,
        SubmissionOutcome::Rejected(_)
        | SubmissionOutcome::TransportFailed(_)
        | SubmissionOutcome::BackendError(_) => ExitCode::FAILURE,
    }
}
