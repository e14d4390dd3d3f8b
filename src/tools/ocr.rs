//! OCR through ocrmypdf or plain Tesseract, plus Tesseract orientation
//! detection.

use crate::domain::model::Layout;
use crate::domain::ports::CommandRunner;
use crate::pdf::document::merge_pdfs;
use crate::tools::command::{run_checked, ToolCommand};
use crate::tools::unpaper::UnpaperArgs;
use crate::utils::error::{PdfError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrmypdfRequest {
    pub languages: String,
    pub layout: Option<Layout>,
    pub output_pages: Option<u8>,
    pub rotated: bool,
    pub clean: bool,
    pub keep_temporary_files: bool,
}

impl OcrmypdfRequest {
    /// unpaper options handed to ocrmypdf. ocrmypdf can neither split pages
    /// nor pre-rotate, so only the layout is forwarded, and not even that
    /// when pages were split beforehand.
    pub fn unpaper_args(&self) -> UnpaperArgs {
        let layout = match (self.layout, self.output_pages) {
            (Some(Layout::None), _) | (_, Some(_)) => None,
            (layout, None) => layout,
        };
        UnpaperArgs {
            layout,
            output_pages: None,
            pre_rotate: None,
            full: false,
        }
    }

    pub fn command(&self, program: &str, input: &Path, output: &Path) -> ToolCommand {
        let mut command = ToolCommand::new(program)
            .arg("-l")
            .arg(self.languages.clone())
            .arg("--force-ocr")
            .args(["--optimize", "3", "--deskew", "--fast-web-view", "0.75"])
            .args(["--output-type", "pdf", "--continue-on-soft-render-error"]);

        if !self.rotated {
            command = command.arg("--rotate-pages");
        }

        if self.clean {
            command = command.args(["--clean", "--clean-final"]);
            let unpaper = self.unpaper_args().to_arg_string();
            if !unpaper.is_empty() {
                command = command.arg("--unpaper-args").arg(unpaper);
            }
        }

        command = if self.keep_temporary_files {
            command.arg("--keep-temporary-files")
        } else {
            command.arg("-q")
        };

        command.path_arg(input).path_arg(output)
    }
}

pub async fn run_ocrmypdf<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    request: &OcrmypdfRequest,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let command = request.command(program, input, output);
    tracing::info!("🔤 Running OCR with ocrmypdf ({})", request.languages);
    run_checked(runner, &command).await?;
    Ok(())
}

pub fn tesseract_pdf_command(program: &str, image: &Path, output_base: &Path, languages: &str) -> ToolCommand {
    ToolCommand::new(program)
        .path_arg(image)
        .path_arg(output_base)
        .arg("-l")
        .arg(languages)
        .arg("pdf")
}

/// OCRs each image into a one-page PDF and merges them in order into
/// `output`.
pub async fn run_tesseract_pages<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    images: &[PathBuf],
    work_dir: &Path,
    languages: &str,
    output: &Path,
) -> Result<()> {
    if images.is_empty() {
        return Err(PdfError::processing("No page images to OCR"));
    }
    std::fs::create_dir_all(work_dir)?;
    tracing::info!("🔤 Running OCR with tesseract on {} page(s)", images.len());

    let mut page_pdfs = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let base = work_dir.join(format!("ocr_{:04}", index + 1));
        let command = tesseract_pdf_command(program, image, &base, languages);
        run_checked(runner, &command).await?;
        page_pdfs.push(base.with_extension("pdf"));
    }

    merge_pdfs(&page_pdfs, output)
}

pub fn osd_command(program: &str, image: &Path) -> ToolCommand {
    ToolCommand::new(program)
        .path_arg(image)
        .arg("stdout")
        .args(["--psm", "0"])
}

/// Clockwise rotation (degrees) Tesseract's OSD asks for, from its
/// `Rotate: N` line.
pub fn parse_osd_rotation(osd: &str) -> Option<u32> {
    static ROTATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = ROTATE_RE.get_or_init(|| Regex::new(r"(?m)^\s*Rotate:\s*(\d+)\s*$").expect("static regex"));

    re.captures(osd)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|angle| angle % 360)
}

pub async fn detect_rotation<R: CommandRunner + ?Sized>(runner: &R, program: &str, image: &Path) -> Result<u32> {
    let command = osd_command(program, image);
    let output = run_checked(runner, &command).await?;
    parse_osd_rotation(&output.combined()).ok_or_else(|| {
        PdfError::processing(format!("No orientation reported for {}", image.display()))
    })
}
