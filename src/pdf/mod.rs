pub mod analyze;
pub mod document;

pub use analyze::{detect_scan, has_no_text, is_scanned_or_hybrid};
pub use document::{count_pages, extract_pages, images_to_pdf, merge_pdfs, page_texts};
