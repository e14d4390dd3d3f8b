mod common;

use common::{write_text_pdf, FakeTools};
use httpmock::prelude::*;
use pdfwtf::domain::model::{FetchSettings, ToolPaths};
use pdfwtf::fetch::{url_to_path, Fetcher, DEFAULT_NAME_LENGTH};
use pdfwtf::{InputSource, PdfEngine, PdfPipeline, ProcessOptions};
use std::sync::Arc;
use tempfile::TempDir;

fn pdf_bytes() -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("remote.pdf");
    write_text_pdf(&path, &["A remote document that is long enough to count as real text"]);
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_pdf_response_is_saved_and_cached() {
    let server = MockServer::start_async().await;
    let pdf_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/papers/remote.pdf");
            then.status(200)
                .header("Content-Type", "application/pdf")
                .body(pdf_bytes());
        })
        .await;

    let temp = TempDir::new().unwrap();
    let tools = FakeTools::default();
    let paths = ToolPaths::default();
    let settings = FetchSettings::default();
    let fetcher = Fetcher::new(&tools, &paths, &settings, temp.path()).unwrap();

    let url = server.url("/papers/remote.pdf");
    let page = fetcher.save_page_as_pdf(&url).await.unwrap();
    let pdf = page.pdf.expect("pdf saved");
    assert_eq!(page.name, url_to_path(&url, DEFAULT_NAME_LENGTH));
    assert_eq!(pdf, temp.path().join("docs").join(format!("{}.pdf", page.name)));
    assert_eq!(pdfwtf::pdf::count_pages(&pdf).unwrap(), 1);
    assert!(page.screenshot.is_none());

    // second call is served from the cache
    fetcher.save_page_as_pdf(&url).await.unwrap();
    pdf_mock.assert_hits_async(1).await;
    assert!(tools.programs().is_empty());
}

#[tokio::test]
async fn test_force_download_and_screenshot() {
    let server = MockServer::start_async().await;
    let pdf_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/doc");
            then.status(200)
                .header("Content-Type", "application/pdf")
                .body(pdf_bytes());
        })
        .await;

    let temp = TempDir::new().unwrap();
    let tools = FakeTools::default();
    let paths = ToolPaths::default();
    let settings = FetchSettings {
        force_download: true,
        screenshot: true,
        ..FetchSettings::default()
    };
    let fetcher = Fetcher::new(&tools, &paths, &settings, temp.path()).unwrap();

    let url = server.url("/doc");
    fetcher.save_page_as_pdf(&url).await.unwrap();
    let page = fetcher.save_page_as_pdf(&url).await.unwrap();

    pdf_mock.assert_hits_async(2).await;
    let shot = page.screenshot.expect("screenshot");
    assert_eq!(shot, temp.path().join("shots").join(format!("{}.png", page.name)));
    assert!(shot.exists());
    assert_eq!(tools.count("gs"), 2);
}

#[tokio::test]
async fn test_html_page_is_printed_by_browser() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/article");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<html><body><h1>Hello</h1></body></html>");
        })
        .await;

    let temp = TempDir::new().unwrap();
    let tools = FakeTools::default();
    let paths = ToolPaths::default();
    let settings = FetchSettings::default();
    let fetcher = Fetcher::new(&tools, &paths, &settings, temp.path()).unwrap();

    let page = fetcher.save_page_as_pdf(&server.url("/article")).await.unwrap();
    assert!(page.pdf.unwrap().exists());
    assert_eq!(tools.count("chromium"), 1);
}

#[tokio::test]
async fn test_error_status_yields_no_pdf() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing.pdf");
            then.status(404).header("Content-Type", "text/html").body("not found");
        })
        .await;

    let temp = TempDir::new().unwrap();
    let tools = FakeTools::default();
    let paths = ToolPaths::default();
    let settings = FetchSettings::default();
    let fetcher = Fetcher::new(&tools, &paths, &settings, temp.path()).unwrap();

    let page = fetcher.save_page_as_pdf(&server.url("/missing.pdf")).await.unwrap();
    assert!(page.pdf.is_none());
    assert!(tools.programs().is_empty());
}

#[tokio::test]
async fn test_url_input_runs_through_pipeline() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/report.pdf");
            then.status(200)
                .header("Content-Type", "application/pdf")
                .body(pdf_bytes());
        })
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let options = ProcessOptions {
        output_dir: out.clone(),
        export_texts: true,
        ..ProcessOptions::default()
    };
    let url = server.url("/report.pdf");
    let tools = Arc::new(FakeTools::default());
    let pipeline = PdfPipeline::new(tools, options, InputSource::Url(url.clone()), dir.path().join("tmp"));

    let report = PdfEngine::new(pipeline).run().await.unwrap();
    let name = url_to_path(&url, DEFAULT_NAME_LENGTH);
    assert_eq!(report.output_pdf, out.join(format!("{}.pdf", name)));
    assert_eq!(report.metadata.source, url);
    assert!(out.join(format!("{}.txt", name)).exists());
}
