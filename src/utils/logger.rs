use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `--debug` and `--verbose` win over `level`, which comes from the
/// settings file. `RUST_LOG` overrides all of them.
pub fn init_cli_logger(verbose: bool, debug: bool, level: Option<&str>) {
    let directive = if debug {
        "pdfwtf=trace,info".to_string()
    } else if verbose {
        "pdfwtf=debug,info".to_string()
    } else {
        format!("pdfwtf={},warn", level.unwrap_or("info"))
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Logs to an append-only file and never to stdout: the docker wrapper stands
/// in for `unpaper`, whose output callers may parse.
pub fn init_file_logger(log_file: &Path, level: &str) -> std::io::Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}
