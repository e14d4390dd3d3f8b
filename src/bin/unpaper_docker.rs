//! Drop-in `unpaper` that runs the containerised build. Put it on `PATH`
//! (or point `[tools] unpaper` at it) where no native unpaper exists. On
//! Windows, install it as `unpaper.exe` in `PDFWTF_HOME_DIR` so ocrmypdf's
//! own unpaper calls find it too.

use anyhow::{Context, Result};
use pdfwtf::tools::unpaper::{docker_command, DOCKER_IMAGE};
use pdfwtf::utils::logger;
use std::path::{Path, PathBuf};
use std::process::Command;

const ROOT_MARKER: &str = "instance";

fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(ROOT_MARKER).exists())
        .map(Path::to_path_buf)
}

fn log_file() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let root = find_project_root(&exe_dir).unwrap_or(exe_dir);
    root.join(ROOT_MARKER).join("logs").join("unpaper_wrap.log")
}

fn is_image_arg(arg: &str) -> bool {
    let lower = arg.to_ascii_lowercase();
    !arg.starts_with('-') && (lower.ends_with(".png") || lower.ends_with(".pnm"))
}

/// Image paths become absolute so they can be mounted into the container.
fn absolutize(args: Vec<String>) -> Result<Vec<String>> {
    let cwd = std::env::current_dir().context("cannot read the working directory")?;
    Ok(args
        .into_iter()
        .map(|arg| {
            if is_image_arg(&arg) && Path::new(&arg).is_relative() {
                cwd.join(&arg).to_string_lossy().into_owned()
            } else {
                arg
            }
        })
        .collect())
}

fn run() -> Result<i32> {
    let args = absolutize(std::env::args().skip(1).collect())?;
    if args.is_empty() {
        return Ok(0);
    }

    let images: Vec<&String> = args.iter().filter(|arg| is_image_arg(arg)).collect();
    if images.len() >= 2 {
        if let Some(parent) = Path::new(images[images.len() - 1]).parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }

    let command = docker_command("docker", DOCKER_IMAGE, &args);
    tracing::debug!("Docker command: {}", command);

    let status = Command::new(&command.program)
        .args(&command.args)
        .status()
        .with_context(|| format!("failed to start {}", command))?;
    if !status.success() {
        tracing::error!("Unpaper failed ({:?}): {}", status.code(), command);
    }
    Ok(status.code().unwrap_or(1))
}

fn main() {
    let log_path = log_file();
    // Logging is best effort; unpaper itself must still run.
    let _ = logger::init_file_logger(&log_path, "error");

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
