use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    /// Copy the cleaned PDF through without a text layer
    None,
    /// One Tesseract PDF per page image, merged afterwards
    Tesseract,
    /// Whole-document OCR through ocrmypdf
    #[default]
    Ocrmypdf,
}

impl fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Tesseract => "tesseract",
            Self::Ocrmypdf => "ocrmypdf",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Single,
    Double,
    None,
}

impl Layout {
    /// unpaper's `--layout` value; `None` means the option is left out.
    pub fn as_unpaper_value(&self) -> Option<&'static str> {
        match self {
            Self::Single => Some("single"),
            Self::Double => Some("double"),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ScanDetection {
    /// Scanned iff no page carries any text
    Text,
    /// Scanned or hybrid unless some page has meaningful text and no large image
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum UnpaperRunner {
    #[default]
    Native,
    Docker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ghostscript: String,
    pub unpaper: String,
    pub tesseract: String,
    pub ocrmypdf: String,
    pub pngquant: String,
    pub docker: String,
    pub browser: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        let ghostscript = if cfg!(windows) { "gswin64c" } else { "gs" };
        Self {
            ghostscript: ghostscript.to_string(),
            unpaper: "unpaper".to_string(),
            tesseract: "tesseract".to_string(),
            ocrmypdf: "ocrmypdf".to_string(),
            pngquant: "pngquant".to_string(),
            docker: "docker".to_string(),
            browser: "chromium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpaperSettings {
    pub runner: UnpaperRunner,
    pub docker_image: String,
}

impl Default for UnpaperSettings {
    fn default() -> Self {
        Self {
            runner: UnpaperRunner::Native,
            docker_image: crate::tools::unpaper::DOCKER_IMAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    pub user_agent: String,
    pub viewport: String,
    pub timeout_seconds: u64,
    pub force_download: bool,
    pub screenshot: bool,
    pub screenshot_zoom: f32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("Mozilla/5.0 (compatible; pdfwtf/", env!("CARGO_PKG_VERSION"), ")")
                .to_string(),
            viewport: "1920x1080".to_string(),
            timeout_seconds: 30,
            force_download: false,
            screenshot: false,
            screenshot_zoom: 2.0,
        }
    }
}

/// Fully resolved settings for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub output_dir: PathBuf,
    pub input_prefix: Option<PathBuf>,
    pub extract_pages: Option<String>,
    pub skip_pages: Option<String>,
    pub ocr: OcrEngine,
    pub languages: String,
    pub dpi: u32,
    pub layout: Option<Layout>,
    pub output_pages: Option<u8>,
    pub pre_rotate: Option<i32>,
    pub detection: ScanDetection,
    pub remove_background: bool,
    pub background_threshold: u8,
    pub clear_temp: bool,
    pub detect_doi: bool,
    pub export_images: bool,
    pub export_texts: bool,
    pub export_thumbs: bool,
    pub scan_dir: String,
    pub txt_dir: String,
    pub img_dir: String,
    pub thumb_dir: String,
    pub tools: ToolPaths,
    pub unpaper: UnpaperSettings,
    pub fetch: FetchSettings,
    pub debug: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            input_prefix: None,
            extract_pages: None,
            skip_pages: None,
            ocr: OcrEngine::default(),
            languages: "eng".to_string(),
            dpi: 300,
            layout: None,
            output_pages: None,
            pre_rotate: None,
            detection: ScanDetection::Text,
            remove_background: false,
            background_threshold: 60,
            clear_temp: false,
            detect_doi: false,
            export_images: false,
            export_texts: false,
            export_thumbs: false,
            scan_dir: "_scans".to_string(),
            txt_dir: "_texts".to_string(),
            img_dir: "_images".to_string(),
            thumb_dir: "_thumbs".to_string(),
            tools: ToolPaths::default(),
            unpaper: UnpaperSettings::default(),
            fetch: FetchSettings::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Url(String),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// State handed from one pipeline stage to the next.
#[derive(Debug, Clone)]
pub struct WorkingDocument {
    pub source: InputSource,
    pub input_pdf: PathBuf,
    pub stem: String,
    pub output_dir: PathBuf,
    pub output_pdf: PathBuf,
    pub temp_dir: PathBuf,
    pub tmp_pdf: PathBuf,
    pub images_dir: PathBuf,
    pub thumbs_dir: PathBuf,
    pub is_scan: bool,
    pub total_pages_in: usize,
    pub rotated: bool,
    pub background_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub output: PathBuf,
    pub pages_in: usize,
    pub pages_out: usize,
    pub scanned: bool,
    pub rotated: bool,
    pub ocr: Option<OcrEngine>,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub output_pdf: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: DocumentMetadata,
}
