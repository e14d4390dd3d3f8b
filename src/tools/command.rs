use crate::config::env::Environment;
use crate::domain::ports::CommandRunner;
use crate::utils::error::{PdfError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// An external program invocation, kept as data so it can be logged,
/// asserted on in tests and executed by any `CommandRunner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: platform_program(program.into(), cfg!(windows)),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name without directory or extension, for messages.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// On Windows unpaper is only reachable through its `unpaper.cmd` launcher;
/// spawning the bare name fails because `.cmd` is not an executable suffix
/// for process creation.
///
/// This covers commands pdfwtf spawns itself. ocrmypdf's `--clean` starts a
/// bare `unpaper` on its own, which only resolves when an `unpaper.exe` (for
/// example the `unpaper-docker` binary renamed) sits in `PDFWTF_HOME_DIR`.
pub fn platform_program(program: String, windows: bool) -> String {
    if windows && program == "unpaper" {
        "unpaper.cmd".to_string()
    } else {
        program
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }

    pub fn into_result(self, command: &ToolCommand) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(PdfError::ToolFailed {
                program: command.program_name(),
                command: command.to_string(),
                code: self.code,
                output: self.combined(),
            })
        }
    }
}

/// Spawns real processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    environment: Environment,
}

impl SystemRunner {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        tracing::debug!("▶️  {}", command);

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        for (key, value) in self.environment.child_env() {
            cmd.env(key, value);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = command.cwd.as_ref() {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PdfError::ToolNotFound {
                    program: command.program.clone(),
                }
            } else {
                PdfError::IoError(e)
            }
        })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::trace!("{} exited with {:?}", command.program_name(), result.code);
        Ok(result)
    }
}

/// Runs the command and turns a non-zero exit into `ToolFailed`.
pub async fn run_checked<R: CommandRunner + ?Sized>(runner: &R, command: &ToolCommand) -> Result<CommandOutput> {
    runner.run(command).await?.into_result(command)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: String,
    pub program: String,
    pub version: Option<String>,
}

/// Asks every configured tool for its version; tools that cannot be started
/// report `None`.
pub async fn probe_tools<R: CommandRunner + ?Sized>(
    runner: &R,
    tools: &crate::domain::model::ToolPaths,
    include_docker: bool,
) -> Vec<ToolStatus> {
    let mut candidates = vec![
        ("ghostscript", tools.ghostscript.as_str()),
        ("unpaper", tools.unpaper.as_str()),
        ("tesseract", tools.tesseract.as_str()),
        ("ocrmypdf", tools.ocrmypdf.as_str()),
        ("pngquant", tools.pngquant.as_str()),
        ("browser", tools.browser.as_str()),
    ];
    if include_docker {
        candidates.push(("docker", tools.docker.as_str()));
    }

    let mut statuses = Vec::with_capacity(candidates.len());
    for (name, program) in candidates {
        let command = ToolCommand::new(program).arg("--version");
        let version = match runner.run(&command).await {
            Ok(output) if output.success() => output.combined().lines().next().map(str::to_string),
            Ok(output) => {
                tracing::debug!("{} --version exited with {:?}", program, output.code);
                None
            }
            Err(e) => {
                tracing::debug!("{} unavailable: {}", program, e);
                None
            }
        };
        statuses.push(ToolStatus {
            name: name.to_string(),
            program: command.program.clone(),
            version,
        });
    }
    statuses
}
