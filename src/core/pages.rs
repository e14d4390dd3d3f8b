use crate::utils::error::{PdfError, Result};

fn range_error(input: &str, reason: impl Into<String>) -> PdfError {
    PdfError::PageRangeError {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn parse_page(spec: &str, value: &str, total: u32) -> Result<u32> {
    let page: u32 = value
        .trim()
        .parse()
        .map_err(|_| range_error(spec, format!("'{}' is not a page number", value.trim())))?;
    if page == 0 {
        return Err(range_error(spec, "pages are numbered from 1"));
    }
    if page > total {
        return Err(range_error(spec, format!("page {} exceeds the {} pages of the document", page, total)));
    }
    Ok(page)
}

/// Parses `"1-3,5,7-"` into sorted, de-duplicated 1-based page numbers.
pub fn parse_page_ranges(spec: &str, total: u32) -> Result<Vec<u32>> {
    let mut pages = Vec::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(range_error(spec, "empty range"));
        }

        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_page(spec, start, total)?;
                let end = if end.trim().is_empty() {
                    total
                } else {
                    parse_page(spec, end, total)?
                };
                if start > end {
                    return Err(range_error(spec, format!("range {} runs backwards", part)));
                }
                pages.extend(start..=end);
            }
            None => pages.push(parse_page(spec, part, total)?),
        }
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    Keep(Vec<u32>),
    Skip(Vec<u32>),
}

impl PageSelection {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Keep(pages) | Self::Skip(pages) => pages.is_empty(),
        }
    }

    /// The pages that survive the selection, ascending.
    pub fn pages_to_keep(&self, total: u32) -> Vec<u32> {
        match self {
            Self::Keep(pages) => {
                let mut kept: Vec<u32> = pages.iter().copied().filter(|p| (1..=total).contains(p)).collect();
                kept.sort_unstable();
                kept.dedup();
                kept
            }
            Self::Skip(pages) => (1..=total).filter(|p| !pages.contains(p)).collect(),
        }
    }
}
