pub mod output;
pub mod shutdown;
pub mod validation;

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use shutdown::detect_shutdown;
use thiserror::Error;
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use validation::{resolve_date_range, CollectionFlags};

use crate::{
    collection::{
        worker::{spawn_collection, CollectedData, CollectionEvent},
        Collector,
    },
    error::{CollectError, RenderError, ValidationError},
    pipeline::{generate_report, ReportRequest},
    platform::{resolve_username, Platform, SystemInfo},
    report::{
        paths::{create_output_directory, unique_filename},
        UserInfo, DEFAULT_REPORT_NAME, DEFAULT_TITLE, REPORT_EXTENSION,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "footprint", version, long_about = None)]
#[command(about = "Summarizes a workstation user's digital footprint into a PDF report")]
#[command(after_help = "Examples:
  footprint --output report.pdf
  footprint --logins-only --output login_report.pdf
  footprint --start-date 2024-01-01 --end-date 2024-01-31 --output monthly_report.pdf
  footprint --title \"Q1 2024 Digital Footprint\" --output q1_report.pdf")]
struct Args {
    #[command(flatten)]
    collection: CollectionFlags,
    #[arg(long, short, help = "Output PDF file path. Defaults to ./reports/digital_footprint_report.pdf")]
    output: Option<PathBuf>,
    #[arg(long, short, default_value = DEFAULT_TITLE, help = "Report title")]
    title: String,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Start date for filtering")]
    start_date: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "End date for filtering")]
    end_date: Option<String>,
    #[arg(long, help = "Display system information and exit")]
    system_info: bool,
    #[arg(long, help = "Print logs to stderr")]
    log: bool,
    #[arg(long, value_name = "LEVEL", help = "Log level, e.g. debug or trace. Defaults to $RUST_LOG or info")]
    log_filter: Option<LevelFilter>,
}

/// Failures that end a run. Each one is shown to the user as a single line.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to prepare output location {path:?}: {source}")]
    Output { path: PathBuf, source: io::Error },
    #[error("No data collected. Check your system permissions.")]
    NoData,
    #[error("{0}")]
    Worker(String),
    #[error("Operation cancelled by user.")]
    Cancelled,
}

pub async fn run_cli() -> ExitCode {
    let args = Args::parse();

    let logging = create_application_default_path()
        .and_then(|path| enable_logging(&path, args.log_filter, args.log));
    if let Err(e) = logging {
        eprintln!("Logging is disabled: {e}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ CliError::NoData) => {
            println!("Warning: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Error running cli {e:?}");
            eprintln!("\nError: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let platform = Platform::current();
    if args.system_info {
        println!("{}", output::system_info(&SystemInfo::query(&platform)));
        return Ok(());
    }

    let selection = args.collection.selection()?;
    let date_range = resolve_date_range(args.start_date.as_deref(), args.end_date.as_deref())?;
    let output_path = resolve_output_path(args.output)?;

    println!("{}", output::banner());

    let now = DefaultClock.time();
    let username = resolve_username();
    let collector = Collector::for_platform(&platform, now, username.as_str())?;

    let cancellation = CancellationToken::new();
    tokio::spawn(detect_shutdown(cancellation.clone()));

    let events = spawn_collection(collector, selection);
    let data = await_collection(events, &cancellation).await?;
    if data.is_empty() {
        return Err(CliError::NoData);
    }

    println!("Generating report: {}", args.title);
    if let Some(range) = date_range {
        println!("Filtering data from {} to {}", range.start(), range.end());
    }
    let request = ReportRequest {
        output_path,
        title: args.title,
        user: UserInfo { name: username },
        date_range,
        generated_at: now,
    };
    let rendering = tokio::task::spawn_blocking(move || generate_report(data, &request));
    let outcome = select! {
        _ = cancellation.cancelled() => return Err(CliError::Cancelled),
        result = rendering => result.map_err(|e| CliError::Worker(format!("Report generation failed: {e}")))??,
    };
    cancellation.cancel();

    info!("Report generated at {:?}", outcome.report_path);
    println!("{}", output::outcome(&outcome, &selection));
    Ok(())
}

/// Uses the requested path as is, otherwise picks a free name in `./reports`.
fn resolve_output_path(requested: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let output_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CliError::Output { path, source }
    };

    match requested {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(output_error(parent))?;
            }
            Ok(path)
        }
        None => {
            let cwd = env::current_dir().map_err(output_error(Path::new(".")))?;
            let dir = create_output_directory(&cwd).map_err(output_error(&cwd))?;
            Ok(unique_filename(&dir, DEFAULT_REPORT_NAME, REPORT_EXTENSION))
        }
    }
}

async fn await_collection(
    mut events: mpsc::Receiver<CollectionEvent>,
    cancellation: &CancellationToken,
) -> Result<CollectedData, CliError> {
    loop {
        let event = select! {
            _ = cancellation.cancelled() => return Err(CliError::Cancelled),
            event = events.recv() => event,
        };
        let Some(event) = event else {
            return Err(CliError::Worker("Collection stopped without a result".into()));
        };
        if let Some(line) = output::progress(&event) {
            println!("{line}");
        }
        match event {
            CollectionEvent::Finished(data) => return Ok(data),
            CollectionEvent::Failed(message) => return Err(CliError::Worker(message)),
            CollectionEvent::Started(_) | CollectionEvent::Collected { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use clap::CommandFactory;

    use crate::record::Category;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() -> Result<()> {
        let args = Args::try_parse_from(["footprint"])?;
        assert_eq!(args.title, DEFAULT_TITLE);
        assert!(args.output.is_none());
        assert!(args.collection.selection().is_ok());
        Ok(())
    }

    #[test]
    fn test_parse_flags() -> Result<()> {
        let args = Args::try_parse_from([
            "footprint",
            "--apps-only",
            "-o",
            "out/report.pdf",
            "-t",
            "Q1",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-31",
            "--log-filter",
            "debug",
        ])?;
        assert!(args.collection.apps_only);
        assert_eq!(args.output, Some(PathBuf::from("out/report.pdf")));
        assert_eq!(args.title, "Q1");
        assert_eq!(args.log_filter, Some(LevelFilter::DEBUG));
        Ok(())
    }

    #[test]
    fn test_requested_output_parent_is_created() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let requested = dir.path().join("nested").join("report.pdf");
        assert_eq!(resolve_output_path(Some(requested.clone()))?, requested);
        assert!(dir.path().join("nested").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_await_collection_returns_data() {
        let (sender, receiver) = mpsc::channel(4);
        sender
            .send(CollectionEvent::Started(Category::Login))
            .await
            .unwrap();
        sender
            .send(CollectionEvent::Finished(CollectedData::default()))
            .await
            .unwrap();

        let data = await_collection(receiver, &CancellationToken::new()).await;

        assert!(data.is_ok_and(|d| d.is_empty()));
    }

    #[tokio::test]
    async fn test_await_collection_cancelled() {
        let (_sender, receiver) = mpsc::channel(4);
        let token = CancellationToken::new();
        token.cancel();

        let result = await_collection(receiver, &token).await;

        assert!(matches!(result, Err(CliError::Cancelled)));
    }

    #[tokio::test]
    async fn test_await_collection_closed_channel() {
        let (sender, receiver) = mpsc::channel::<CollectionEvent>(4);
        drop(sender);

        let result = await_collection(receiver, &CancellationToken::new()).await;

        assert!(matches!(result, Err(CliError::Worker(_))));
    }
}
