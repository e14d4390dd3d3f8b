use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const HOME_DIR_VAR: &str = "PDFWTF_HOME_DIR";
pub const TEMP_DIR_VAR: &str = "PDFWTF_TEMP_DIR";

/// Locations taken from `PDFWTF_HOME_DIR` / `PDFWTF_TEMP_DIR`, applied to
/// every spawned tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub home_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    /// `.env` file the variables were loaded from, if one was found.
    pub dotenv_file: Option<PathBuf>,
}

impl Environment {
    /// Loads `.env` from the working directory (if any), then reads the
    /// process environment. Runs before logging is set up, so the caller
    /// reports `dotenv_file`.
    pub fn load() -> Self {
        let dotenv_file = dotenvy::dotenv().ok();
        Self {
            dotenv_file,
            ..Self::from_process()
        }
    }

    /// Same as [`Environment::load`] with an explicit `.env` file.
    pub fn load_file(path: &Path) -> Self {
        let dotenv_file = dotenvy::from_path(path).ok().map(|_| path.to_path_buf());
        Self {
            dotenv_file,
            ..Self::from_process()
        }
    }

    fn from_process() -> Self {
        Self::from_vars(
            std::env::var_os(HOME_DIR_VAR),
            std::env::var_os(TEMP_DIR_VAR),
        )
    }

    pub fn from_vars(home: Option<OsString>, temp: Option<OsString>) -> Self {
        let home_dir = home.filter(|v| !v.is_empty()).map(PathBuf::from);
        let temp_dir = temp
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| home_dir.as_ref().map(|home| home.join("tmp")));
        Self {
            home_dir,
            temp_dir,
            dotenv_file: None,
        }
    }

    /// `PATH` with the home directory in front, so helper launchers placed
    /// there shadow system binaries.
    pub fn search_path(&self) -> Option<OsString> {
        let current = std::env::var_os("PATH");
        let home = self.home_dir.as_ref()?;

        let mut paths = vec![home.clone()];
        if let Some(current) = current.as_ref() {
            paths.extend(std::env::split_paths(current));
        }
        std::env::join_paths(paths).ok()
    }

    /// Variables to set on child processes.
    pub fn child_env(&self) -> Vec<(String, OsString)> {
        let mut vars = Vec::new();
        if let Some(path) = self.search_path() {
            vars.push(("PATH".to_string(), path));
        }
        if let Some(temp) = self.temp_dir.as_ref() {
            for key in ["TMPDIR", "TEMP", "TMP"] {
                vars.push((key.to_string(), temp.clone().into_os_string()));
            }
        }
        vars
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pdfwtf"))
    }
}
