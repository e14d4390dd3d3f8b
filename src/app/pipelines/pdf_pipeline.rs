use crate::core::pages::{parse_page_ranges, PageSelection};
use crate::core::{CommandRunner, Pipeline, ProcessOptions, ProcessReport, WorkingDocument};
use crate::domain::model::{DocumentMetadata, InputSource, OcrEngine};
use crate::fetch::Fetcher;
use crate::imaging::{convert_to_png, correct_orientation, crop_dark_background, export_thumbnails, THUMBNAIL_WIDTH};
use crate::pdf::{count_pages, detect_scan, extract_pages, images_to_pdf};
use crate::text::{detect_doi, export_text, write_summary};
use crate::tools::ghostscript::{render_pages, RenderFormat};
use crate::tools::ocr::{run_ocrmypdf, run_tesseract_pages, OcrmypdfRequest};
use crate::tools::unpaper::{Unpaper, UnpaperArgs};
use crate::utils::error::{PdfError, Result};
use crate::utils::fs::{
    copy_dir_contents, copy_file, file_stem, list_files_with_ext, output_dir_for, path_hash, prepare_temp_dir,
    reset_dir, write_json,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs one input through page selection, scan cleanup, OCR and the
/// requested exports.
pub struct PdfPipeline<R: CommandRunner> {
    runner: Arc<R>,
    options: ProcessOptions,
    source: InputSource,
    temp_root: PathBuf,
}

impl<R: CommandRunner> PdfPipeline<R> {
    pub fn new(runner: Arc<R>, options: ProcessOptions, source: InputSource, temp_root: PathBuf) -> Self {
        Self {
            runner,
            options,
            source,
            temp_root,
        }
    }

    async fn resolve_input(&self, temp_dir: &Path) -> Result<PathBuf> {
        match &self.source {
            InputSource::File(path) => {
                if !path.is_file() {
                    return Err(PdfError::ValidationError {
                        message: format!("Input file not found: {}", path.display()),
                    });
                }
                Ok(path.canonicalize()?)
            }
            InputSource::Url(url) => {
                let fetcher = Fetcher::new(self.runner.as_ref(), &self.options.tools, &self.options.fetch, temp_dir)?;
                let page = fetcher.save_page_as_pdf(url).await?;
                if let Some(shot) = &page.screenshot {
                    tracing::info!("📸 Screenshot saved to {}", shot.display());
                }
                page.pdf
                    .ok_or_else(|| PdfError::processing(format!("No PDF could be fetched from {}", url)))
            }
        }
    }

    fn unpaper(&self) -> Unpaper<'_, R> {
        Unpaper::new(
            self.runner.as_ref(),
            &self.options.tools.unpaper,
            &self.options.tools.docker,
            &self.options.unpaper,
        )
    }

    /// Renders, straightens and cleans the pages of a scanned document,
    /// then rebuilds the temp PDF from the cleaned images.
    async fn clean_scans(&self, doc: &mut WorkingDocument, work_dir: &Path) -> Result<()> {
        let opts = &self.options;
        let runner = self.runner.as_ref();

        let scans_dir = work_dir.join(&opts.scan_dir);
        let files = render_pages(runner, &opts.tools.ghostscript, &doc.tmp_pdf, &scans_dir, opts.dpi, RenderFormat::Png)
            .await?;
        tracing::debug!("Rendered {} page(s) to {}", files.len(), scans_dir.display());

        doc.rotated = if opts.pre_rotate.is_some() {
            true
        } else {
            correct_orientation(runner, &opts.tools.tesseract, &files).await?
        };
        if opts.remove_background {
            doc.background_removed = crop_dark_background(&files, opts.background_threshold)?;
        }

        let unpaper = self.unpaper();
        if opts.debug {
            match unpaper.version().await {
                Ok(version) => tracing::debug!("unpaper version: {}", version.trim()),
                Err(e) => tracing::debug!("unpaper version unavailable: {}", e),
            }
            tracing::debug!("Rotated pages: {}", doc.rotated);
            tracing::debug!("Background removed from: {}", doc.background_removed);
        }

        let pnm_dir = work_dir.join("_pnm");
        std::fs::create_dir_all(&pnm_dir)?;
        let args = UnpaperArgs {
            layout: opts.layout,
            output_pages: opts.output_pages,
            pre_rotate: opts.pre_rotate,
            full: true,
        }
        .to_args();

        for file in &files {
            let stem = file_stem(file);
            let output = if opts.output_pages.is_some() {
                pnm_dir.join(format!("{}_%03d.pnm", stem))
            } else {
                pnm_dir.join(format!("{}.pnm", stem))
            };
            if let Err(e) = unpaper.run(file, &output, f64::from(opts.dpi), &args, work_dir).await {
                tracing::warn!("Unpaper failed for {}: {}", file.display(), e);
            }
        }

        // images_dir may hold pages from an earlier run of the same stem
        reset_dir(&doc.images_dir)?;
        let pnms = list_files_with_ext(&pnm_dir, "pnm")?;
        for pnm in &pnms {
            convert_to_png(pnm, &doc.images_dir.join(format!("{}.png", file_stem(pnm))))?;
        }
        let has_images = !list_files_with_ext(&doc.images_dir, "png")?.is_empty();

        if has_images {
            let pages = images_to_pdf(&doc.images_dir, &doc.tmp_pdf, opts.dpi)?;
            tracing::info!("🧹 Rebuilt {} cleaned page(s)", pages);
        } else {
            tracing::warn!("No cleaned pages produced, keeping the rendered scans");
            copy_dir_contents(&scans_dir, &doc.images_dir)?;
        }
        Ok(())
    }

    async fn run_ocr(&self, doc: &WorkingDocument, work_dir: &Path) -> Result<()> {
        let opts = &self.options;
        let runner = self.runner.as_ref();
        match opts.ocr {
            OcrEngine::Ocrmypdf => {
                let request = OcrmypdfRequest {
                    languages: opts.languages.clone(),
                    layout: opts.layout,
                    output_pages: opts.output_pages,
                    rotated: doc.rotated,
                    clean: true,
                    keep_temporary_files: opts.debug,
                };
                run_ocrmypdf(runner, &opts.tools.ocrmypdf, &request, &doc.tmp_pdf, &doc.output_pdf).await
            }
            OcrEngine::Tesseract => {
                let images = list_files_with_ext(&doc.images_dir, "png")?;
                run_tesseract_pages(
                    runner,
                    &opts.tools.tesseract,
                    &images,
                    &work_dir.join("_ocr"),
                    &opts.languages,
                    &doc.output_pdf,
                )
                .await
            }
            OcrEngine::None => copy_file(&doc.tmp_pdf, &doc.output_pdf),
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> Pipeline for PdfPipeline<R> {
    async fn prepare(&self) -> Result<WorkingDocument> {
        let opts = &self.options;
        let temp_dir = prepare_temp_dir(&self.temp_root, opts.clear_temp)?;
        let input_pdf = self.resolve_input(&temp_dir).await?;

        let prefix = opts
            .input_prefix
            .as_ref()
            .map(|prefix| prefix.canonicalize().unwrap_or_else(|_| prefix.clone()));
        let output_dir = output_dir_for(&opts.output_dir, &input_pdf, prefix.as_deref());
        std::fs::create_dir_all(&output_dir)?;

        let stem = file_stem(&input_pdf);
        let file_name = input_pdf
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.pdf", stem)));
        let output_pdf = output_dir.join(file_name);

        let hash = path_hash(&input_pdf);
        let tmp_pdf = temp_dir.join(format!("{}_{}.tmp.pdf", hash, stem));
        let images_dir = output_dir.join(format!("{}_{}", opts.img_dir, stem));
        let thumbs_dir = output_dir.join(format!("{}_{}", opts.thumb_dir, stem));

        let is_scan = detect_scan(&input_pdf, opts.detection)?;
        let total_pages_in = count_pages(&input_pdf)?;
        tracing::debug!("Using temporary dir: {}", temp_dir.display());
        tracing::debug!("PDF was scanned: {}", is_scan);

        match &opts.extract_pages {
            Some(spec) => {
                let backup = output_dir.join(format!("{}.orig.pdf", stem));
                copy_file(&input_pdf, &backup)?;
                let pages = parse_page_ranges(spec, total_pages_in as u32)?;
                tracing::info!("✂️  Keeping {} of {} page(s)", pages.len(), total_pages_in);
                extract_pages(&input_pdf, &tmp_pdf, &PageSelection::Keep(pages))?;
            }
            None => copy_file(&input_pdf, &tmp_pdf)?,
        }

        Ok(WorkingDocument {
            source: self.source.clone(),
            input_pdf,
            stem,
            output_dir,
            output_pdf,
            temp_dir,
            tmp_pdf,
            images_dir,
            thumbs_dir,
            is_scan,
            total_pages_in,
            rotated: false,
            background_removed: 0,
        })
    }

    async fn transform(&self, mut doc: WorkingDocument) -> Result<WorkingDocument> {
        if !doc.is_scan {
            copy_file(&doc.tmp_pdf, &doc.output_pdf)?;
            remove_if_exists(&doc.tmp_pdf)?;
            return Ok(doc);
        }

        let work = tempfile::Builder::new().prefix("pdfwtf-").tempdir_in(&doc.temp_dir)?;

        self.clean_scans(&mut doc, work.path()).await?;
        self.run_ocr(&doc, work.path()).await?;
        remove_if_exists(&doc.tmp_pdf)?;

        if self.options.debug {
            let kept = work.keep();
            tracing::debug!("Keeping work dir {}", kept.display());
        }
        Ok(doc)
    }

    async fn load(&self, doc: WorkingDocument) -> Result<ProcessReport> {
        let opts = &self.options;
        let runner = self.runner.as_ref();

        if let Some(spec) = &opts.skip_pages {
            let total = count_pages(&doc.output_pdf)?;
            let pages = parse_page_ranges(spec, total as u32)?;
            tracing::info!("✂️  Removing {} page(s)", pages.len());
            extract_pages(&doc.output_pdf, &doc.output_pdf, &PageSelection::Skip(pages))?;
        }

        if doc.output_pdf.exists() && (opts.export_images || opts.export_thumbs) {
            let images = render_pages(
                runner,
                &opts.tools.ghostscript,
                &doc.output_pdf,
                &doc.images_dir,
                opts.dpi,
                RenderFormat::Png,
            )
            .await?;
            tracing::info!("🖼️  Exported {} page image(s)", images.len());
            if opts.export_thumbs {
                export_thumbnails(&doc.images_dir, &doc.thumbs_dir, THUMBNAIL_WIDTH)?;
            }
        }

        let pages_out = if doc.output_pdf.exists() {
            count_pages(&doc.output_pdf)?
        } else {
            0
        };

        let mut doi = None;
        if (opts.export_texts || opts.detect_doi) && pages_out > 0 {
            let texts_dir = doc.output_dir.join(format!("{}_{}", opts.txt_dir, doc.stem));
            let pages = export_text(&doc.output_pdf, &texts_dir)?;
            if !pages.is_empty() {
                write_summary(&doc.output_dir.join(format!("{}.txt", doc.stem)), &pages, pages_out)?;
                if opts.detect_doi {
                    let dois = detect_doi(&texts_dir)?;
                    if !dois.is_empty() {
                        tracing::info!("DOI: {}", dois.join(", "));
                    }
                    doi = Some(dois);
                }
            }
        }

        let metadata = DocumentMetadata {
            source: doc.source.to_string(),
            output: doc.output_pdf.clone(),
            pages_in: doc.total_pages_in,
            pages_out,
            scanned: doc.is_scan,
            rotated: doc.rotated,
            ocr: doc.is_scan.then_some(opts.ocr),
            processed_at: Utc::now(),
            doi,
        };
        let metadata_path = doc.output_dir.join(format!("{}.meta.json", doc.stem));
        write_json(&metadata, &metadata_path)?;

        Ok(ProcessReport {
            output_pdf: doc.output_pdf,
            metadata_path,
            metadata,
        })
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
