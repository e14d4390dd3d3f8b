use crate::domain::ports::CommandRunner;
use crate::tools::command::{run_checked, ToolCommand};
use crate::utils::error::Result;
use crate::utils::fs::{list_files_with_ext, reset_dir};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Png,
    Jpeg,
}

impl RenderFormat {
    fn device(&self) -> &'static str {
        match self {
            Self::Png => "png16m",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Page limits must precede the input file: gs reads anything after it as
/// further inputs.
pub fn render_command(
    gs: &str,
    pdf: &Path,
    output_pattern: &Path,
    dpi: u32,
    format: RenderFormat,
    pages: Option<(u32, u32)>,
) -> ToolCommand {
    let mut command = ToolCommand::new(gs)
        .args(["-q", "-dNOPAUSE", "-dBATCH", "-dSAFER"])
        .arg(format!("-sDEVICE={}", format.device()))
        .arg(format!("-r{}", dpi))
        .args(["-dTextAlphaBits=4", "-dGraphicsAlphaBits=4"]);
    if let Some((first, last)) = pages {
        command = command
            .arg(format!("-dFirstPage={}", first))
            .arg(format!("-dLastPage={}", last));
    }
    command
        .arg(format!("-sOutputFile={}", output_pattern.display()))
        .path_arg(pdf)
}

/// Renders every page of `pdf` to `out_dir/page_NNN.<ext>`. The directory is
/// emptied first; a missing PDF yields no pages.
pub async fn render_pages<R: CommandRunner + ?Sized>(
    runner: &R,
    gs: &str,
    pdf: &Path,
    out_dir: &Path,
    dpi: u32,
    format: RenderFormat,
) -> Result<Vec<PathBuf>> {
    reset_dir(out_dir)?;

    if !pdf.exists() {
        tracing::warn!("Nothing to render, {} does not exist", pdf.display());
        return Ok(Vec::new());
    }

    let pattern = out_dir.join(format!("page_%03d.{}", format.extension()));
    let command = render_command(gs, pdf, &pattern, dpi, format, None);
    run_checked(runner, &command).await?;

    let pages = list_files_with_ext(out_dir, format.extension())?;
    tracing::debug!("Rendered {} page(s) at {} DPI into {}", pages.len(), dpi, out_dir.display());
    Ok(pages)
}

/// Renders page 1 at `zoom` × 72 DPI into `output` (PNG).
pub async fn render_first_page<R: CommandRunner + ?Sized>(
    runner: &R,
    gs: &str,
    pdf: &Path,
    output: &Path,
    zoom: f32,
) -> Result<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dpi = (72.0 * zoom).round().max(1.0) as u32;
    let command = render_command(gs, pdf, output, dpi, RenderFormat::Png, Some((1, 1)));
    run_checked(runner, &command).await?;
    Ok(())
}
