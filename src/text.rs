//! Per-page text export and DOI lookup.

use crate::pdf::document::page_texts;
use crate::utils::error::Result;
use crate::utils::fs::reset_dir;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Writes `page_NNN.txt` for every page of `pdf` into a fresh `out_dir`.
pub fn export_text(pdf: &Path, out_dir: &Path) -> Result<BTreeMap<usize, String>> {
    reset_dir(out_dir)?;
    let mut pages = BTreeMap::new();
    if !pdf.exists() {
        return Ok(pages);
    }

    for (index, text) in page_texts(pdf)?.into_iter().enumerate() {
        let number = index + 1;
        fs::write(page_text_path(out_dir, number), &text)?;
        pages.insert(number, text);
    }
    tracing::debug!("Exported text of {} page(s) to {}", pages.len(), out_dir.display());
    Ok(pages)
}

pub fn page_text_path(dir: &Path, number: usize) -> PathBuf {
    dir.join(format!("page_{:03}.txt", number))
}

pub fn format_summary(pages: &BTreeMap<usize, String>, total: usize) -> String {
    let mut summary = String::new();
    for (number, text) in pages {
        let _ = write!(summary, "--- Page {} of {} ---\n{}\n\n", number, total, text);
    }
    summary
}

pub fn write_summary(path: &Path, pages: &BTreeMap<usize, String>, total: usize) -> Result<()> {
    fs::write(path, format_summary(pages, total))?;
    Ok(())
}

fn doi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b10\.\d{4,9}/\S+").expect("static regex"))
}

/// DOIs in order of appearance, trailing punctuation trimmed, no repeats.
pub fn find_dois(text: &str) -> Vec<String> {
    let mut dois: Vec<String> = Vec::new();
    for m in doi_re().find_iter(text) {
        let doi = m
            .as_str()
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '}' | '"' | '\''));
        if !doi.is_empty() && !dois.iter().any(|d| d == doi) {
            dois.push(doi.to_string());
        }
    }
    dois
}

/// DOIs printed on the first page, read back from the exported texts.
pub fn detect_doi(texts_dir: &Path) -> Result<Vec<String>> {
    let first = page_text_path(texts_dir, 1);
    if !first.exists() {
        return Ok(Vec::new());
    }
    Ok(find_dois(&fs::read_to_string(first)?))
}
