use crate::config::toml_config::TomlConfig;
use crate::domain::model::{InputSource, Layout, OcrEngine, ProcessOptions, ScanDetection, UnpaperRunner};
use crate::utils::error::{PdfError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::path::PathBuf;

fn parse_pre_rotate(value: &str) -> std::result::Result<i32, String> {
    match value.trim() {
        "90" => Ok(90),
        "-90" => Ok(-90),
        other => Err(format!("'{}' is not a supported rotation (use 90 or -90)", other)),
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pdfwtf")]
#[command(about = "Clean up, OCR and index scanned or born-digital PDFs")]
#[command(version)]
pub struct CliConfig {
    #[arg(long = "infile", value_name = "PDF", help = "Input PDF file (repeatable)")]
    pub infile: Vec<PathBuf>,

    #[arg(long, help = "Fetch the input from a URL instead of a file")]
    pub url: Option<String>,

    #[arg(long, help = "Output directory [default: output]")]
    pub outdir: Option<PathBuf>,

    #[arg(long, help = "Mirror the input's folders below this prefix into the output directory")]
    pub input_prefix: Option<PathBuf>,

    #[arg(long, value_name = "PAGES", help = "Pages to keep, e.g. '1-3,5,7-'")]
    pub extract: Option<String>,

    #[arg(long, value_name = "PAGES", help = "Pages to remove from the output, e.g. '1,4-'")]
    pub remove: Option<String>,

    #[arg(long, value_enum, help = "OCR engine for scanned input [default: ocrmypdf]")]
    pub ocr: Option<OcrEngine>,

    #[arg(long, help = "OCR language(s), e.g. 'eng+ces' [default: eng]")]
    pub lang: Option<String>,

    #[arg(long, help = "Resolution for page rendering [default: 300]")]
    pub dpi: Option<u32>,

    #[arg(long, value_enum, help = "Page layout passed to unpaper")]
    pub layout: Option<Layout>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2), help = "Split into 1 or 2 output pages")]
    pub output_pages: Option<u8>,

    #[arg(long, allow_negative_numbers = true, value_parser = parse_pre_rotate, help = "Rotate scans by 90 or -90 degrees before cleanup")]
    pub pre_rotate: Option<i32>,

    #[arg(long = "detect", value_enum, help = "Scan detection heuristic [default: text]")]
    pub detection: Option<ScanDetection>,

    #[arg(long, help = "Crop dark scanner background from page edges")]
    pub remove_background: bool,

    #[arg(long, help = "Empty the temporary directory before processing")]
    pub clear_temp: bool,

    #[arg(long, help = "Detect DOIs on the first page")]
    pub doi: bool,

    #[arg(long, help = "Export page images")]
    pub images: bool,

    #[arg(long, help = "Export per-page text and a summary")]
    pub texts: bool,

    #[arg(long, help = "Export page thumbnails")]
    pub thumbs: bool,

    #[arg(long, help = "Name of the rendered scans directory [default: _scans]")]
    pub scan_dir: Option<String>,

    #[arg(long, help = "Prefix of the text export directory [default: _texts]")]
    pub txt_dir: Option<String>,

    #[arg(long, help = "Prefix of the image export directory [default: _images]")]
    pub img_dir: Option<String>,

    #[arg(long, help = "Prefix of the thumbnail directory [default: _thumbs]")]
    pub thumb_dir: Option<String>,

    #[arg(long, value_enum, help = "Run unpaper natively or through docker [default: native]")]
    pub unpaper_runner: Option<UnpaperRunner>,

    #[arg(long, help = "Download URLs again even if cached")]
    pub force_download: bool,

    #[arg(long, help = "Save a PNG of the fetched document's first page")]
    pub screenshot: bool,

    #[arg(long, value_name = "FILE", help = "TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Report the external tools found and exit")]
    pub check_tools: bool,

    #[arg(long, help = "Keep temporary files and log debug output")]
    pub debug: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn load_toml(&self) -> Result<Option<TomlConfig>> {
        let Some(path) = &self.config else {
            return Ok(None);
        };
        let config = TomlConfig::from_file(path)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Built-in defaults, then the TOML file, then flags given on the
    /// command line.
    pub fn to_options(&self, toml: Option<&TomlConfig>) -> ProcessOptions {
        let mut options = ProcessOptions::default();
        if let Some(toml) = toml {
            toml.apply_to(&mut options);
        }

        if let Some(outdir) = &self.outdir {
            options.output_dir = outdir.clone();
        }
        if self.input_prefix.is_some() {
            options.input_prefix = self.input_prefix.clone();
        }
        options.extract_pages = self.extract.clone();
        options.skip_pages = self.remove.clone();
        if let Some(ocr) = self.ocr {
            options.ocr = ocr;
        }
        if let Some(lang) = &self.lang {
            options.languages = lang.clone();
        }
        if let Some(dpi) = self.dpi {
            options.dpi = dpi;
        }
        if self.layout.is_some() {
            options.layout = self.layout;
        }
        if self.output_pages.is_some() {
            options.output_pages = self.output_pages;
        }
        options.pre_rotate = self.pre_rotate;
        if let Some(detection) = self.detection {
            options.detection = detection;
        }
        options.remove_background |= self.remove_background;
        options.clear_temp = self.clear_temp;
        options.detect_doi |= self.doi;
        options.export_images |= self.images;
        options.export_texts |= self.texts;
        options.export_thumbs |= self.thumbs;
        for (target, value) in [
            (&mut options.scan_dir, &self.scan_dir),
            (&mut options.txt_dir, &self.txt_dir),
            (&mut options.img_dir, &self.img_dir),
            (&mut options.thumb_dir, &self.thumb_dir),
        ] {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        if let Some(runner) = self.unpaper_runner {
            options.unpaper.runner = runner;
        }
        options.fetch.force_download = self.force_download;
        options.fetch.screenshot = self.screenshot;
        options.debug = self.debug;
        options
    }

    /// Files first, then the URL.
    pub fn inputs(&self) -> Vec<InputSource> {
        let mut inputs: Vec<InputSource> = self.infile.iter().cloned().map(InputSource::File).collect();
        if let Some(url) = &self.url {
            inputs.push(InputSource::Url(url.clone()));
        }
        inputs
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.check_tools {
            return Ok(());
        }
        if self.infile.is_empty() && self.url.is_none() {
            return Err(PdfError::MissingConfigError {
                field: "--infile or --url".to_string(),
            });
        }
        for file in &self.infile {
            validation::validate_file_extension("infile", &file.to_string_lossy(), &["pdf"])?;
        }
        if let Some(url) = &self.url {
            validation::validate_url("url", url)?;
        }
        for (field, value) in [("extract", &self.extract), ("remove", &self.remove)] {
            if let Some(pages) = value {
                validation::validate_non_empty_string(field, pages)?;
            }
        }
        if let Some(lang) = &self.lang {
            validation::validate_languages("lang", lang)?;
        }
        if let Some(dpi) = self.dpi {
            validation::validate_range("dpi", dpi, 50, 1200)?;
        }
        for (field, value) in [
            ("scan-dir", &self.scan_dir),
            ("txt-dir", &self.txt_dir),
            ("img-dir", &self.img_dir),
            ("thumb-dir", &self.thumb_dir),
        ] {
            if let Some(name) = value {
                validation::validate_dir_name(field, name)?;
            }
        }
        Ok(())
    }
}
