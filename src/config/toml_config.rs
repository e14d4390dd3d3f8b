use crate::domain::model::{Layout, OcrEngine, ProcessOptions, ScanDetection, UnpaperRunner};
use crate::utils::error::{PdfError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Optional settings file; every section and key may be left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub tools: ToolsConfig,
    pub defaults: DefaultsConfig,
    pub unpaper: UnpaperConfig,
    pub fetch: FetchConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub ghostscript: Option<String>,
    pub unpaper: Option<String>,
    pub tesseract: Option<String>,
    pub ocrmypdf: Option<String>,
    pub pngquant: Option<String>,
    pub docker: Option<String>,
    pub browser: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub output_dir: Option<PathBuf>,
    pub input_prefix: Option<PathBuf>,
    pub ocr: Option<OcrEngine>,
    pub lang: Option<String>,
    pub dpi: Option<u32>,
    pub layout: Option<Layout>,
    pub output_pages: Option<u8>,
    pub detection: Option<ScanDetection>,
    pub remove_background: Option<bool>,
    pub background_threshold: Option<u8>,
    pub doi: Option<bool>,
    pub images: Option<bool>,
    pub texts: Option<bool>,
    pub thumbs: Option<bool>,
    pub scan_dir: Option<String>,
    pub txt_dir: Option<String>,
    pub img_dir: Option<String>,
    pub thumb_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnpaperConfig {
    pub runner: Option<UnpaperRunner>,
    pub docker_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub user_agent: Option<String>,
    pub viewport: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub screenshot_zoom: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn set<T>(target: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PdfError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        static VAR_RE: OnceLock<Regex> = OnceLock::new();
        let re = VAR_RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        let d = &self.defaults;
        if let Some(dpi) = d.dpi {
            validation::validate_range("defaults.dpi", dpi, 50, 1200)?;
        }
        if let Some(lang) = &d.lang {
            validation::validate_languages("defaults.lang", lang)?;
        }
        if let Some(pages) = d.output_pages {
            validation::validate_range("defaults.output_pages", pages, 1, 2)?;
        }
        for (field, value) in [
            ("defaults.scan_dir", &d.scan_dir),
            ("defaults.txt_dir", &d.txt_dir),
            ("defaults.img_dir", &d.img_dir),
            ("defaults.thumb_dir", &d.thumb_dir),
        ] {
            if let Some(name) = value {
                validation::validate_dir_name(field, name)?;
            }
        }

        let tools = &self.tools;
        for (field, value) in [
            ("tools.ghostscript", &tools.ghostscript),
            ("tools.unpaper", &tools.unpaper),
            ("tools.tesseract", &tools.tesseract),
            ("tools.ocrmypdf", &tools.ocrmypdf),
            ("tools.pngquant", &tools.pngquant),
            ("tools.docker", &tools.docker),
            ("tools.browser", &tools.browser),
        ] {
            if let Some(program) = value {
                validation::validate_non_empty_string(field, program)?;
            }
        }

        if let Some(image) = &self.unpaper.docker_image {
            validation::validate_non_empty_string("unpaper.docker_image", image)?;
        }
        if let Some(timeout) = self.fetch.timeout_seconds {
            validation::validate_range("fetch.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(zoom) = self.fetch.screenshot_zoom {
            validation::validate_range("fetch.screenshot_zoom", zoom, 0.1, 10.0)?;
        }
        Ok(())
    }

    /// Layers the file's settings over `options`.
    pub fn apply_to(&self, options: &mut ProcessOptions) {
        let t = &self.tools;
        set(&mut options.tools.ghostscript, &t.ghostscript);
        set(&mut options.tools.unpaper, &t.unpaper);
        set(&mut options.tools.tesseract, &t.tesseract);
        set(&mut options.tools.ocrmypdf, &t.ocrmypdf);
        set(&mut options.tools.pngquant, &t.pngquant);
        set(&mut options.tools.docker, &t.docker);
        set(&mut options.tools.browser, &t.browser);

        let d = &self.defaults;
        set(&mut options.output_dir, &d.output_dir);
        if d.input_prefix.is_some() {
            options.input_prefix = d.input_prefix.clone();
        }
        set(&mut options.ocr, &d.ocr);
        set(&mut options.languages, &d.lang);
        set(&mut options.dpi, &d.dpi);
        if d.layout.is_some() {
            options.layout = d.layout;
        }
        if d.output_pages.is_some() {
            options.output_pages = d.output_pages;
        }
        set(&mut options.detection, &d.detection);
        set(&mut options.remove_background, &d.remove_background);
        set(&mut options.background_threshold, &d.background_threshold);
        set(&mut options.detect_doi, &d.doi);
        set(&mut options.export_images, &d.images);
        set(&mut options.export_texts, &d.texts);
        set(&mut options.export_thumbs, &d.thumbs);
        set(&mut options.scan_dir, &d.scan_dir);
        set(&mut options.txt_dir, &d.txt_dir);
        set(&mut options.img_dir, &d.img_dir);
        set(&mut options.thumb_dir, &d.thumb_dir);

        set(&mut options.unpaper.runner, &self.unpaper.runner);
        set(&mut options.unpaper.docker_image, &self.unpaper.docker_image);

        let f = &self.fetch;
        set(&mut options.fetch.user_agent, &f.user_agent);
        set(&mut options.fetch.viewport, &f.viewport);
        set(&mut options.fetch.timeout_seconds, &f.timeout_seconds);
        set(&mut options.fetch.screenshot_zoom, &f.screenshot_zoom);
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
