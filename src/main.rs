//! Simplygon pipeline batch worker - Main Entry Point
//!
//! Runs one pipeline file against one scene file on behalf of a
//! `ProcessingModule` in another process. Standard output carries the
//! progress protocol; logs only ever go to a file.

use anyhow::Context;
use sgpipeline_rs::processing::protocol::error_line;
use sgpipeline_rs::worker::{run_worker, WorkerArgs};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_NAME: &str = "sgpipeline-worker.log";

fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Could not create log directory {:?}", log_dir))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE_NAME));

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sgpipeline_rs=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Could not initialise logging")?;

    Ok(guard)
}

fn run(args: &WorkerArgs) -> anyhow::Result<()> {
    let _guard = match &args.log_dir {
        Some(dir) => Some(init_logging(dir)?),
        None => None,
    };

    run_worker(args, std::io::stdout())?;
    Ok(())
}

fn report(message: &str) -> ExitCode {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(error_line(message).as_bytes());
    let _ = stdout.flush();
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args = match WorkerArgs::parse_from_legacy(std::env::args_os()) {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => return report(&e.to_string()),
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Batch job failed: {}", e);
            report(&e.to_string())
        }
    }
}
