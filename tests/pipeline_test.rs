mod common;

use common::{write_scan_pdf, write_text_pdf, FakeTools};
use pdfwtf::domain::model::{DocumentMetadata, OcrEngine};
use pdfwtf::{InputSource, PdfEngine, PdfError, PdfPipeline, ProcessOptions};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ARTICLE: &str = "Journal of Tests, volume 3. Available at doi 10.5555/jot.2024.001 under open access";

fn options(out: &Path) -> ProcessOptions {
    ProcessOptions {
        output_dir: out.to_path_buf(),
        ..ProcessOptions::default()
    }
}

async fn run(
    tools: &Arc<FakeTools>,
    options: ProcessOptions,
    source: InputSource,
    temp: &Path,
) -> pdfwtf::Result<pdfwtf::ProcessReport> {
    let pipeline = PdfPipeline::new(tools.clone(), options, source, temp.to_path_buf());
    PdfEngine::new(pipeline).run().await
}

fn read_metadata(path: &Path) -> DocumentMetadata {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_born_digital_extract_remove_texts_and_doi() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("article.pdf");
    write_text_pdf(
        &input,
        &[
            ARTICLE,
            "Second page with the methods section of the article text",
            "Third page is an appendix that gets dropped by extraction",
        ],
    );
    let out = dir.path().join("out");

    let mut opts = options(&out);
    opts.extract_pages = Some("1-2".to_string());
    opts.skip_pages = Some("2".to_string());
    opts.export_texts = true;
    opts.detect_doi = true;

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input.clone()), &dir.path().join("tmp"))
        .await
        .unwrap();

    // born-digital input never reaches an external tool
    assert!(tools.programs().is_empty());

    assert_eq!(report.output_pdf, out.join("article.pdf"));
    assert_eq!(pdfwtf::pdf::count_pages(&report.output_pdf).unwrap(), 1);
    assert_eq!(pdfwtf::pdf::count_pages(&out.join("article.orig.pdf")).unwrap(), 3);

    assert!(out.join("_texts_article").join("page_001.txt").exists());
    let summary = std::fs::read_to_string(out.join("article.txt")).unwrap();
    assert!(summary.starts_with("--- Page 1 of 1 ---\n"));

    let metadata = read_metadata(&report.metadata_path);
    assert_eq!(report.metadata_path, out.join("article.meta.json"));
    assert_eq!(metadata.pages_in, 3);
    assert_eq!(metadata.pages_out, 1);
    assert!(!metadata.scanned);
    assert_eq!(metadata.ocr, None);
    assert_eq!(metadata.doi, Some(vec!["10.5555/jot.2024.001".to_string()]));

    let temp_files: Vec<_> = std::fs::read_dir(dir.path().join("tmp")).unwrap().collect();
    assert!(temp_files.is_empty(), "temp PDF should be removed");
}

#[tokio::test]
async fn test_metadata_omits_doi_unless_requested() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("plain.pdf");
    write_text_pdf(&input, &[ARTICLE]);
    let out = dir.path().join("out");

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, options(&out), InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(&report.metadata_path).unwrap();
    assert!(!raw.contains("\"doi\""));
    assert!(!out.join("plain.txt").exists());
}

#[tokio::test]
async fn test_scanned_input_is_cleaned_and_ocred() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    write_scan_pdf(&input, 2);
    let out = dir.path().join("out");

    let mut opts = options(&out);
    opts.export_thumbs = true;

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    assert_eq!(tools.count("gs"), 2, "render scans, then export images");
    assert_eq!(tools.count("tesseract"), 2, "one orientation check per page");
    assert_eq!(tools.count("unpaper"), 2);
    assert_eq!(tools.count("ocrmypdf"), 1);

    assert_eq!(pdfwtf::pdf::count_pages(&report.output_pdf).unwrap(), 2);
    assert!(out.join("_images_scan").join("page_002.png").exists());
    assert!(out.join("_thumbs_scan").join("page_001.jpg").exists());

    let metadata = read_metadata(&report.metadata_path);
    assert!(metadata.scanned);
    assert!(!metadata.rotated);
    assert_eq!(metadata.ocr, Some(OcrEngine::Ocrmypdf));
}

#[tokio::test]
async fn test_pre_rotate_skips_orientation_detection() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    write_scan_pdf(&input, 1);

    let mut opts = options(&dir.path().join("out"));
    opts.pre_rotate = Some(90);

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    assert_eq!(tools.count("tesseract"), 0);
    assert!(report.metadata.rotated);

    let calls = tools.calls.lock().unwrap();
    let ocr = calls.iter().find(|c| c.program_name() == "ocrmypdf").unwrap();
    assert!(!ocr.args.contains(&"--rotate-pages".to_string()));
    let unpaper = calls.iter().find(|c| c.program_name() == "unpaper").unwrap();
    assert!(unpaper.args.windows(2).any(|w| w == ["--pre-rotate", "90"]));
}

#[tokio::test]
async fn test_unpaper_failure_falls_back_to_rendered_scans() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    write_scan_pdf(&input, 2);
    let out = dir.path().join("out");

    let tools = Arc::new(FakeTools {
        unpaper_fails: true,
        ..FakeTools::default()
    });
    let report = run(&tools, options(&out), InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    assert_eq!(tools.count("unpaper"), 2);
    assert!(out.join("_images_scan").join("page_001.png").exists());
    assert_eq!(pdfwtf::pdf::count_pages(&report.output_pdf).unwrap(), 2);
}

#[tokio::test]
async fn test_tesseract_engine_merges_page_pdfs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    write_scan_pdf(&input, 3);

    let mut opts = options(&dir.path().join("out"));
    opts.ocr = OcrEngine::Tesseract;

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    // three OSD checks plus three page OCR runs
    assert_eq!(tools.count("tesseract"), 6);
    assert_eq!(tools.count("ocrmypdf"), 0);
    assert_eq!(pdfwtf::pdf::count_pages(&report.output_pdf).unwrap(), 3);
    assert_eq!(report.metadata.ocr, Some(OcrEngine::Tesseract));
}

#[tokio::test]
async fn test_input_prefix_mirrors_folders() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("inbox").join("2024").join("march");
    std::fs::create_dir_all(&nested).unwrap();
    let input = nested.join("memo.pdf");
    write_text_pdf(&input, &[ARTICLE]);
    let out = dir.path().join("out");

    let mut opts = options(&out);
    opts.input_prefix = Some(dir.path().join("inbox"));

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    assert!(report.output_pdf.ends_with("2024/march/memo.pdf"));
    assert!(report.output_pdf.exists());
}

#[tokio::test]
async fn test_missing_input_and_bad_ranges_fail() {
    let dir = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::default());

    let missing = InputSource::File(dir.path().join("nope.pdf"));
    let err = run(&tools, options(dir.path()), missing, &dir.path().join("tmp"))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfError::ValidationError { .. }));

    let input = dir.path().join("short.pdf");
    write_text_pdf(&input, &[ARTICLE, ARTICLE]);
    let mut opts = options(&dir.path().join("out"));
    opts.extract_pages = Some("2-5".to_string());
    let err = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfError::PageRangeError { .. }));
}

#[tokio::test]
async fn test_rerun_with_failed_unpaper_drops_stale_images() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    let out = dir.path().join("out");
    let temp = dir.path().join("tmp");

    write_scan_pdf(&input, 3);
    let mut opts = options(&out);
    opts.ocr = OcrEngine::Tesseract;
    let tools = Arc::new(FakeTools::default());
    let first = run(&tools, opts.clone(), InputSource::File(input.clone()), &temp)
        .await
        .unwrap();
    assert_eq!(pdfwtf::pdf::count_pages(&first.output_pdf).unwrap(), 3);

    // same stem, fewer pages, and this time unpaper produces nothing
    write_scan_pdf(&input, 1);
    let failing = Arc::new(FakeTools {
        unpaper_fails: true,
        ..FakeTools::default()
    });
    let second = run(&failing, opts, InputSource::File(input), &temp).await.unwrap();

    assert_eq!(second.metadata.pages_in, 1);
    assert_eq!(pdfwtf::pdf::count_pages(&second.output_pdf).unwrap(), 1);
    let images: Vec<_> = std::fs::read_dir(out.join("_images_scan")).unwrap().collect();
    assert_eq!(images.len(), 1);
}

#[tokio::test]
async fn test_scanned_run_leaves_temp_dir_empty() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scan.pdf");
    write_scan_pdf(&input, 2);
    let temp = dir.path().join("tmp");

    let tools = Arc::new(FakeTools::default());
    run(&tools, options(&dir.path().join("out")), InputSource::File(input), &temp)
        .await
        .unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(&temp).unwrap().collect();
    assert!(leftovers.is_empty(), "temp dir should hold nothing after a run");
}

#[tokio::test]
async fn test_output_pages_splits_sheets_and_drops_ocr_layout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("spread.pdf");
    write_scan_pdf(&input, 1);
    let out = dir.path().join("out");

    let mut opts = options(&out);
    opts.layout = Some(pdfwtf::domain::model::Layout::Double);
    opts.output_pages = Some(2);

    let tools = Arc::new(FakeTools::default());
    let report = run(&tools, opts, InputSource::File(input), &dir.path().join("tmp"))
        .await
        .unwrap();

    let calls = tools.calls.lock().unwrap();
    let unpaper = calls.iter().find(|c| c.program_name() == "unpaper").unwrap();
    assert!(unpaper.args.windows(2).any(|w| w == ["--layout", "double"]));
    assert!(unpaper.args.windows(2).any(|w| w == ["--output-pages", "2"]));
    assert!(unpaper.args.last().unwrap().ends_with("page_001_%03d.pnm"));

    let ocr = calls.iter().find(|c| c.program_name() == "ocrmypdf").unwrap();
    assert!(!ocr.args.contains(&"--unpaper-args".to_string()));

    let images = out.join("_images_spread");
    assert!(images.join("page_001_001.png").exists());
    assert!(images.join("page_001_002.png").exists());
    assert_eq!(report.metadata.pages_in, 1);
    assert_eq!(pdfwtf::pdf::count_pages(&report.output_pdf).unwrap(), 2);
}

#[tokio::test]
async fn test_clear_temp_empties_temp_dir_first() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("tmp");
    std::fs::create_dir_all(temp.join("docs")).unwrap();
    std::fs::write(temp.join("stale_old.tmp.pdf"), b"stale").unwrap();
    std::fs::write(temp.join("docs").join("cached.pdf"), b"stale").unwrap();

    let input = dir.path().join("plain.pdf");
    write_text_pdf(&input, &[ARTICLE]);
    let mut opts = options(&dir.path().join("out"));
    opts.clear_temp = true;

    let tools = Arc::new(FakeTools::default());
    run(&tools, opts, InputSource::File(input), &temp).await.unwrap();

    assert!(temp.is_dir());
    assert!(!temp.join("stale_old.tmp.pdf").exists());
    assert!(!temp.join("docs").exists());
}
