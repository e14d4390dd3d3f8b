//! Turns a URL into a local PDF: direct download for PDF responses, a
//! headless browser print for HTML pages.

use crate::domain::model::{FetchSettings, ToolPaths};
use crate::domain::ports::CommandRunner;
use crate::tools::{browser, ghostscript};
use crate::utils::error::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DOCS_DIR: &str = "docs";
pub const SHOTS_DIR: &str = "shots";
pub const DEFAULT_NAME_LENGTH: usize = 32;

/// Last path segment of the URL, percent-decoded. Empty when the path has
/// no file part.
pub fn filename_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Filesystem-safe name for a URL: URL-safe base64 of its SHA-256 digest,
/// without padding, cut to `length` characters.
pub fn url_to_path(url: &str, length: usize) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(Sha256::digest(url.as_bytes()));
    encoded.chars().take(length).collect()
}

fn is_pdf_response(content_type: &str, url: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/pdf") || url.to_ascii_lowercase().ends_with(".pdf")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub name: String,
    pub pdf: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
}

pub struct Fetcher<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a ToolPaths,
    settings: &'a FetchSettings,
    temp_root: PathBuf,
    client: Client,
}

impl<'a, R: CommandRunner + ?Sized> Fetcher<'a, R> {
    pub fn new(runner: &'a R, tools: &'a ToolPaths, settings: &'a FetchSettings, temp_root: &Path) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            runner,
            tools,
            settings,
            temp_root: temp_root.to_path_buf(),
            client,
        })
    }

    pub fn pdf_path(&self, name: &str) -> PathBuf {
        self.temp_root.join(DOCS_DIR).join(format!("{}.pdf", name))
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.temp_root.join(SHOTS_DIR).join(format!("{}.png", name))
    }

    pub async fn save_page_as_pdf(&self, url: &str) -> Result<FetchedPage> {
        let name = url_to_path(url, DEFAULT_NAME_LENGTH);
        let output_pdf = self.pdf_path(&name);
        if let Some(parent) = output_pdf.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if output_pdf.exists() && !self.settings.force_download {
            tracing::debug!("File already exists: {}", output_pdf.display());
        } else if !self.download(url, &output_pdf).await? {
            tracing::warn!("No PDF could be produced for {}", url);
        }

        let pdf = output_pdf.exists().then(|| output_pdf.clone());
        let screenshot = match (&pdf, self.settings.screenshot) {
            (Some(pdf), true) => self.take_screenshot(pdf, &name).await,
            _ => None,
        };

        Ok(FetchedPage { name, pdf, screenshot })
    }

    async fn download(&self, url: &str, output_pdf: &Path) -> Result<bool> {
        tracing::info!("🌐 Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        tracing::debug!("Detected status: {}, content type: {:?}", status, content_type);

        let Some(content_type) = content_type else {
            tracing::warn!("No content type for {}", url);
            return Ok(false);
        };
        if status != StatusCode::OK {
            tracing::warn!("{} answered with HTTP {}", url, status.as_u16());
            return Ok(false);
        }

        if is_pdf_response(&content_type, url) {
            let body = response.bytes().await?;
            std::fs::write(output_pdf, &body)?;
            let remote_name = filename_from_url(url);
            tracing::info!(
                "PDF {} saved to {} ({} bytes)",
                if remote_name.is_empty() { url } else { remote_name.as_str() },
                output_pdf.display(),
                body.len()
            );
        } else {
            tracing::info!("HTML page detected - rendering to PDF");
            browser::print_to_pdf(self.runner, &self.tools.browser, url, output_pdf, self.settings).await?;
            tracing::info!("Page rendered to {}", output_pdf.display());
        }
        Ok(true)
    }

    async fn take_screenshot(&self, pdf: &Path, name: &str) -> Option<PathBuf> {
        let shot = self.screenshot_path(name);
        if shot.exists() && !self.settings.force_download {
            return Some(shot);
        }
        match ghostscript::render_first_page(
            self.runner,
            &self.tools.ghostscript,
            pdf,
            &shot,
            self.settings.screenshot_zoom,
        )
        .await
        {
            Ok(()) => Some(shot),
            Err(e) => {
                tracing::warn!("Could not create screenshot: {}", e);
                None
            }
        }
    }
}
