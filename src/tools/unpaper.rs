//! unpaper invocation: argument building, native and dockerised execution.

use crate::domain::model::{Layout, UnpaperRunner, UnpaperSettings};
use crate::domain::ports::CommandRunner;
use crate::tools::command::{run_checked, ToolCommand};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub const DOCKER_IMAGE: &str = "unpaper-alpine";

/// Defaults used when unpaper runs on its own: keep narrow columns, leave the
/// content where it is, and do not touch gray or black areas.
const FULL_DEFAULTS: [&str; 6] = [
    "--mask-scan-size",
    "100",
    "--no-border-align",
    "--no-mask-center",
    "--no-grayfilter",
    "--no-blackfilter",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpaperArgs {
    pub layout: Option<Layout>,
    pub output_pages: Option<u8>,
    pub pre_rotate: Option<i32>,
    pub full: bool,
}

impl UnpaperArgs {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.full {
            args.extend(FULL_DEFAULTS.iter().map(|s| s.to_string()));
        }

        if let Some(layout) = self.layout.and_then(|l| l.as_unpaper_value()) {
            args.push("--layout".to_string());
            args.push(layout.to_string());
        }

        if let Some(degrees) = self.pre_rotate {
            args.push("--pre-rotate".to_string());
            args.push(degrees.to_string());
        }

        if let Some(pages @ (1 | 2)) = self.output_pages {
            args.push("--output-pages".to_string());
            args.push(pages.to_string());
        }

        args
    }

    /// Space joined form, as ocrmypdf's `--unpaper-args` expects.
    pub fn to_arg_string(&self) -> String {
        self.to_args().join(" ")
    }
}

/// Formats DPI the way unpaper parses it: integral values without a fraction,
/// otherwise at most six decimals.
fn format_dpi(dpi: f64) -> String {
    if dpi.fract() == 0.0 {
        format!("{}", dpi as i64)
    } else {
        let s = format!("{:.6}", dpi);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub struct Unpaper<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    program: &'a str,
    docker_program: &'a str,
    settings: &'a UnpaperSettings,
}

impl<'a, R: CommandRunner + ?Sized> Unpaper<'a, R> {
    pub fn new(runner: &'a R, program: &'a str, docker_program: &'a str, settings: &'a UnpaperSettings) -> Self {
        Self {
            runner,
            program,
            docker_program,
            settings,
        }
    }

    fn build(&self, args: Vec<String>) -> ToolCommand {
        match self.settings.runner {
            UnpaperRunner::Native => ToolCommand::new(self.program).args(args),
            UnpaperRunner::Docker => docker_command(self.docker_program, &self.settings.docker_image, &args),
        }
    }

    pub fn command(&self, input: &Path, output: &Path, dpi: f64, mode_args: &[String], workdir: &Path) -> ToolCommand {
        let mut args = vec!["-v".to_string(), "--dpi".to_string(), format_dpi(dpi)];
        args.extend(mode_args.iter().cloned());
        args.push(input.to_string_lossy().into_owned());
        args.push(output.to_string_lossy().into_owned());
        self.build(args).current_dir(workdir)
    }

    pub async fn run(&self, input: &Path, output: &Path, dpi: f64, mode_args: &[String], workdir: &Path) -> Result<()> {
        let input = absolute(input)?;
        let output = absolute(output)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let command = self.command(&input, &output, dpi, mode_args, workdir);
        let result = run_checked(self.runner, &command).await?;
        tracing::trace!("unpaper: {}", result.combined());
        Ok(())
    }

    pub async fn version(&self) -> Result<String> {
        let command = self.build(vec!["--version".to_string()]);
        let output = run_checked(self.runner, &command).await?;
        Ok(output.combined())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn is_image_path(arg: &str) -> bool {
    let lower = arg.to_ascii_lowercase();
    [".png", ".pnm", ".pbm", ".pgm", ".ppm"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Translates an unpaper command line into a `docker run` of the unpaper
/// image. The last two image paths are the input and output; their parent
/// directories are mounted at `/data0` (and `/data1` when they differ).
/// Without an input/output pair (`--version`, `--help`) the arguments pass
/// through unchanged.
pub fn docker_command(docker: &str, image: &str, args: &[String]) -> ToolCommand {
    let mut options = Vec::new();
    let mut paths = Vec::new();
    for arg in args {
        if !arg.starts_with('-') && is_image_path(arg) {
            paths.push(PathBuf::from(arg));
        } else {
            options.push(arg.clone());
        }
    }

    if paths.len() < 2 {
        return ToolCommand::new(docker)
            .args(["run", "--rm", image])
            .args(args.iter().cloned());
    }

    let input = &paths[paths.len() - 2];
    let output = &paths[paths.len() - 1];
    let input_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let output_dir = output.parent().unwrap_or_else(|| Path::new("."));

    let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let mut command = ToolCommand::new(docker).args([
        "run", "--rm", "-e", "TMP=/data0", "-e", "TEMP=/data0", "-v",
    ]);
    command = command.arg(format!("{}:/data0", input_dir.display()));

    let output_container = if input_dir == output_dir {
        format!("/data0/{}", file_name(output))
    } else {
        command = command
            .arg("-v")
            .arg(format!("{}:/data1", output_dir.display()));
        format!("/data1/{}", file_name(output))
    };

    command
        .arg(image)
        .args(options)
        .arg(format!("/data0/{}", file_name(input)))
        .arg(output_container)
}
