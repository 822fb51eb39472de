//! CLI entry point for uplink.

mod cli;

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uplink::api::ApiClient;
use uplink::config::{load_config, Config};
use uplink::error::NormalizedError;
use uplink::logging::init_logging;
use uplink::session::{Notifier, SessionEvent, StaticAuthService};
use uplink::textutil::format_file_size;
use uplink::upload::{UploadFile, UploadOutcome, Uploader};

use cli::Command;

const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Notifier printing user-facing messages to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let uploader = build_uploader(&config);
    let watcher = watch_session(uploader.client().subscribe());
    // Errors hold a replay handle on the client; keep only the message so
    // dropping the uploader closes the event channel.
    let result = run(args.command, &uploader)
        .await
        .map_err(|e| e.message().to_string());
    drop(uploader);
    let _ = watcher.await;

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn build_uploader(config: &Config) -> Uploader {
    let auth = Arc::new(StaticAuthService::from_parts(
        &config.session.token,
        config.session.session_id.as_deref(),
    ));
    let client = ApiClient::new(config, auth);
    Uploader::new(client, Arc::new(StderrNotifier), &config.upload)
}

fn watch_session(mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Invalidated) => eprintln!("{SESSION_EXPIRED_MESSAGE}"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn run(command: Command, uploader: &Uploader) -> Result<ExitCode, NormalizedError> {
    match command {
        Command::Upload { path } => {
            let file = UploadFile::from_path(&path).await.map_err(|e| {
                NormalizedError::validation(format!("cannot read {}: {e}", path.display()))
                    .with_cause(e)
            })?;
            let (mut progress, upload) = uploader.upload_with_progress(Some(&file));
            let show = async {
                let mut shown = false;
                while let Some(percent) = progress.next().await {
                    eprint!("\ruploading {}: {percent:>3}%", file.name);
                    shown = true;
                }
                if shown {
                    eprintln!();
                }
            };
            let (outcome, ()) = tokio::join!(upload, show);
            match outcome? {
                UploadOutcome::Completed(record) => print_json(&record),
                // Already reported through the notifier.
                UploadOutcome::Rejected { .. } => return Ok(ExitCode::FAILURE),
            }
        }
        Command::Get { file_id } => print_json(&uploader.get_file(&file_id).await?),
        Command::Delete { file_id } => print_json(&uploader.delete_file(&file_id).await?),
        Command::Link {
            filename,
            preview,
            with_auth,
        } => {
            let url = if preview {
                uploader.preview_url(&filename, with_auth).await?
            } else {
                uploader.download_url(&filename, with_auth).await?
            };
            println!("{url}");
        }
        Command::Size { bytes } => println!("{}", format_file_size(bytes)),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: failed to render response: {e}"),
    }
}
