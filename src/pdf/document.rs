use crate::core::pages::PageSelection;
use crate::utils::error::{PdfError, Result};
use crate::utils::fs::list_files_with_ext;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its `Pages` ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

pub fn load(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| {
        tracing::debug!("Failed to load {}: {}", path.display(), e);
        PdfError::from(e)
    })
}

pub fn count_pages(path: &Path) -> Result<usize> {
    Ok(load(path)?.get_pages().len())
}

/// Writes `output` with only the pages `selection` keeps. `input` and
/// `output` may be the same file. An empty selection leaves everything
/// untouched.
pub fn extract_pages(input: &Path, output: &Path, selection: &PageSelection) -> Result<()> {
    if selection.is_empty() {
        return Ok(());
    }

    let mut doc = load(input)?;
    let total = doc.get_pages().len() as u32;
    let keep = selection.pages_to_keep(total);
    if keep.is_empty() {
        return Err(PdfError::processing(format!(
            "Page selection leaves no pages of {} in {}",
            total,
            input.display()
        )));
    }

    let delete: Vec<u32> = (1..=total).filter(|p| keep.binary_search(p).is_err()).collect();
    if !delete.is_empty() {
        doc.delete_pages(&delete);
        doc.prune_objects();
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(output)?;
    tracing::debug!("Kept {} of {} page(s) -> {}", keep.len(), total, output.display());
    Ok(())
}

/// Extracted text per page, in page order. Pages whose text cannot be
/// decoded count as empty.
pub fn page_texts(path: &Path) -> Result<Vec<String>> {
    let doc = load(path)?;
    Ok(doc
        .get_pages()
        .keys()
        .map(|&number| doc.extract_text(&[number]).unwrap_or_default())
        .collect())
}

fn page_content(width_pt: f32, height_pt: f32) -> Content {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width_pt),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height_pt),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Builds a PDF with one full-page image per PNG in `dir` (name order). Page
/// size follows from the pixel size and `dpi`.
pub fn images_to_pdf(dir: &Path, output: &Path, dpi: u32) -> Result<usize> {
    let images = list_files_with_ext(dir, "png")?;
    if images.is_empty() {
        return Err(PdfError::processing(format!("No PNG images in {}", dir.display())));
    }
    let scale = 72.0 / dpi.max(1) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for path in &images {
        let img = image::open(path)?;
        let (width, height) = (img.width(), img.height());
        let (color_space, data) = if img.color().has_color() {
            ("DeviceRGB", img.to_rgb8().into_raw())
        } else {
            ("DeviceGray", img.to_luma8().into_raw())
        };

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8_i64,
            },
            data,
        ));

        let (width_pt, height_pt) = (width as f32 * scale, height as f32 * scale);
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            page_content(width_pt, height_pt).encode()?,
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width_pt),
                Object::Real(height_pt),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(output)?;
    tracing::debug!("Built {} from {} image(s)", output.display(), count);
    Ok(count)
}

fn has_type(object: &Object, type_name: &[u8]) -> bool {
    match object {
        Object::Dictionary(dict) => dict
            .get(b"Type")
            .and_then(Object::as_name)
            .map(|name| name == type_name)
            .unwrap_or(false),
        _ => false,
    }
}

fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            let known = page.has(key) || found.iter().any(|(k, _)| k.as_slice() == key);
            if !known {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 64 {
            break;
        }
    }
    found
}

/// Concatenates `inputs` into `output`. Page tree nodes of the inputs are
/// dropped, so inherited attributes are first copied onto each page.
pub fn merge_pdfs(inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        return Err(PdfError::processing("Nothing to merge"));
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in inputs {
        let mut doc = load(path)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let attributes = inherited_attributes(&doc, page_id);
            if let Ok(page) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
                for (key, value) in attributes {
                    page.set(key, value);
                }
            }
            page_ids.push(page_id);
        }

        for (id, object) in doc.objects {
            if has_type(&object, b"Catalog") || has_type(&object, b"Pages") || has_type(&object, b"Outlines") {
                continue;
            }
            objects.insert(id, object);
        }
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    for page_id in &page_ids {
        if let Ok(page) = merged.get_object_mut(*page_id).and_then(|o| o.as_dict_mut()) {
            page.set("Parent", pages_id);
        }
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.compress();

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    merged.save(output)?;
    tracing::debug!("Merged {} file(s), {} page(s) -> {}", inputs.len(), page_ids.len(), output.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;

    /// Born-digital PDF, one page per entry in `texts`.
    pub fn write_text_pdf(path: &Path, texts: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    pub fn write_png(path: &Path, width: u32, height: u32, luma: u8) {
        image::GrayImage::from_pixel(width, height, image::Luma([luma]))
            .save(path)
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_keep_and_skip() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.pdf");
        write_text_pdf(&input, &["one", "two", "three", "four"]);
        assert_eq!(count_pages(&input).unwrap(), 4);

        let kept = dir.path().join("kept.pdf");
        extract_pages(&input, &kept, &PageSelection::Keep(vec![2, 4])).unwrap();
        assert_eq!(count_pages(&kept).unwrap(), 2);

        extract_pages(&kept, &kept, &PageSelection::Skip(vec![1])).unwrap();
        assert_eq!(count_pages(&kept).unwrap(), 1);
        let texts = page_texts(&kept).unwrap();
        assert!(texts[0].contains("four"));
    }

    #[test]
    fn test_extract_rejects_empty_result() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.pdf");
        write_text_pdf(&input, &["only"]);
        let out = dir.path().join("out.pdf");
        assert!(extract_pages(&input, &out, &PageSelection::Skip(vec![1])).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.pdf");
        write_text_pdf(&input, &["only"]);
        let out = dir.path().join("out.pdf");
        extract_pages(&input, &out, &PageSelection::Keep(vec![])).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_images_to_pdf_page_size() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        write_png(&images.join("page_001.png"), 300, 600, 255);
        write_png(&images.join("page_002.png"), 300, 600, 200);

        let out = dir.path().join("scan.pdf");
        assert_eq!(images_to_pdf(&images, &out, 150).unwrap(), 2);

        let doc = Document::load(&out).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        let page = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let height = match &media_box[3] {
            Object::Real(h) => *h,
            Object::Integer(h) => *h as f32,
            other => panic!("unexpected height {:?}", other),
        };
        assert!((height - 288.0).abs() < 0.01);
    }

    #[test]
    fn test_merge_preserves_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_text_pdf(&a, &["alpha"]);
        write_text_pdf(&b, &["beta", "gamma"]);

        let out = dir.path().join("merged.pdf");
        merge_pdfs(&[a, b], &out).unwrap();

        let texts = page_texts(&out).unwrap();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("alpha"));
        assert!(texts[2].contains("gamma"));
    }
}
