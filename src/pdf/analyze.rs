//! Heuristics telling scanned documents from born-digital ones.

use crate::domain::model::ScanDetection;
use crate::pdf::document::{load, page_texts};
use crate::utils::error::Result;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

pub const MIN_MEANINGFUL_CHARS: usize = 30;
pub const MIN_MEANINGFUL_WORDS: usize = 5;
pub const LARGE_IMAGE_RATIO: f32 = 0.4;

fn page_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[\W_]*\d+[\W_]*\s*$").expect("static regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// True when no page carries any text at all.
pub fn has_no_text(path: &Path) -> Result<bool> {
    Ok(page_texts(path)?.iter().all(|text| text.trim().is_empty()))
}

pub fn is_meaningful_text(text: &str, min_chars: usize, min_words: usize) -> bool {
    let text = text.trim();
    if text.chars().count() < min_chars {
        return false;
    }
    word_re().find_iter(text).count() >= min_words
}

/// Drops lines that hold nothing but a page number like `- 12 -`.
pub fn strip_page_numbers(text: &str) -> String {
    text.lines()
        .filter(|line| !page_number_re().is_match(line))
        .collect::<Vec<_>>()
        .join(" ")
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Looks `key` up on the page, then on its `Pages` ancestors.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_area(doc: &Document, page: &Dictionary) -> Option<f32> {
    let media_box = inherited(doc, page, b"MediaBox")?.as_array().ok()?;
    let values: Vec<f32> = media_box.iter().filter_map(number).collect();
    if values.len() != 4 {
        return None;
    }
    let area = (values[2] - values[0]).abs() * (values[3] - values[1]).abs();
    (area > 0.0).then_some(area)
}

fn image_xobject_names(doc: &Document, page: &Dictionary) -> HashSet<Vec<u8>> {
    let mut names = HashSet::new();
    let Some(resources) = inherited(doc, page, b"Resources").and_then(|r| r.as_dict().ok()) else {
        return names;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return names;
    };

    for (name, value) in xobjects.iter() {
        let is_image = match resolve(doc, value) {
            Some(Object::Stream(stream)) => stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|subtype| subtype == b"Image")
                .unwrap_or(false),
            _ => false,
        };
        if is_image {
            names.insert(name.clone());
        }
    }
    names
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × ctm`, the update a `cm` operator applies.
fn concat(m: &Matrix, ctm: &Matrix) -> Matrix {
    [
        m[0] * ctm[0] + m[1] * ctm[2],
        m[0] * ctm[1] + m[1] * ctm[3],
        m[2] * ctm[0] + m[3] * ctm[2],
        m[2] * ctm[1] + m[3] * ctm[3],
        m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
        m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
    ]
}

/// Areas (in user space units) of every image painted directly by the
/// content stream. Images inside form XObjects are not followed.
pub fn placed_image_areas(content: &Content, image_names: &HashSet<Vec<u8>>) -> Vec<f32> {
    let mut areas = Vec::new();
    let mut stack: Vec<Matrix> = Vec::new();
    let mut ctm = IDENTITY;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => ctm = stack.pop().unwrap_or(IDENTITY),
            "cm" => {
                let values: Vec<f32> = op.operands.iter().filter_map(number).collect();
                if let Ok(m) = <[f32; 6]>::try_from(values.as_slice()) {
                    ctm = concat(&m, &ctm);
                }
            }
            "Do" => {
                let name = op.operands.first().and_then(|o| o.as_name().ok());
                if let Some(name) = name {
                    if image_names.contains(name) {
                        areas.push((ctm[0] * ctm[3] - ctm[1] * ctm[2]).abs());
                    }
                }
            }
            _ => {}
        }
    }
    areas
}

pub fn page_has_large_image(doc: &Document, page_id: ObjectId, min_area_ratio: f32) -> bool {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return false;
    };
    let Some(area) = page_area(doc, page) else {
        return false;
    };
    let names = image_xobject_names(doc, page);
    if names.is_empty() {
        return false;
    }
    let Some(content) = doc
        .get_page_content(page_id)
        .ok()
        .and_then(|bytes| Content::decode(&bytes).ok())
    else {
        return false;
    };

    placed_image_areas(&content, &names)
        .into_iter()
        .any(|image_area| image_area / area >= min_area_ratio)
}

/// False only for truly born-digital documents: some page has meaningful
/// text and no page-sized image behind it.
pub fn is_scanned_or_hybrid(path: &Path) -> Result<bool> {
    let doc = load(path)?;
    for (number, page_id) in doc.get_pages() {
        let text = doc.extract_text(&[number]).unwrap_or_default();
        let cleaned = strip_page_numbers(&text);
        if is_meaningful_text(&cleaned, MIN_MEANINGFUL_CHARS, MIN_MEANINGFUL_WORDS)
            && !page_has_large_image(&doc, page_id, LARGE_IMAGE_RATIO)
        {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn detect_scan(path: &Path, mode: ScanDetection) -> Result<bool> {
    match mode {
        ScanDetection::Text => has_no_text(path),
        ScanDetection::Hybrid => is_scanned_or_hybrid(path),
    }
}
