use crate::domain::model::FetchSettings;
use crate::domain::ports::CommandRunner;
use crate::tools::command::{run_checked, ToolCommand};
use crate::utils::error::{PdfError, Result};
use std::path::Path;

/// `1920x1080` → `1920,1080` as Chromium's `--window-size` wants it.
fn window_size(viewport: &str) -> Option<String> {
    let (w, h) = viewport.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    Some(format!("{},{}", w, h))
}

pub fn print_to_pdf_command(program: &str, url: &str, output: &Path, settings: &FetchSettings) -> ToolCommand {
    let mut command = ToolCommand::new(program).args([
        "--headless=new",
        "--disable-gpu",
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-extensions",
        "--mute-audio",
        "--log-level=3",
        "--no-pdf-header-footer",
    ]);
    command = command.arg(format!("--user-agent={}", settings.user_agent));
    match window_size(&settings.viewport) {
        Some(size) => command = command.arg(format!("--window-size={}", size)),
        None => tracing::warn!("Invalid viewport format: {}", settings.viewport),
    }
    command
        .arg(format!("--timeout={}", settings.timeout_seconds * 1000))
        .arg(format!("--print-to-pdf={}", output.display()))
        .arg(url)
}

/// Renders an HTML page to PDF with a headless Chromium.
pub async fn print_to_pdf<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    url: &str,
    output: &Path,
    settings: &FetchSettings,
) -> Result<()> {
    let command = print_to_pdf_command(program, url, output, settings);
    run_checked(runner, &command).await?;
    if !output.exists() {
        return Err(PdfError::processing(format!("Browser produced no PDF for {}", url)));
    }
    Ok(())
}
