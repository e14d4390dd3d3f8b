#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfwtf::domain::ports::CommandRunner;
use pdfwtf::tools::{CommandOutput, ToolCommand};
use pdfwtf::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

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

pub fn write_page_png(path: &Path, width: u32, height: u32) {
    image::GrayImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            image::Luma([250])
        } else {
            image::Luma([20])
        }
    })
    .save(path)
    .unwrap();
}

/// Image-only PDF with `pages` pages, as a scanner would produce.
pub fn write_scan_pdf(path: &Path, pages: usize) {
    let dir = tempfile::TempDir::new().unwrap();
    for page in 1..=pages {
        write_page_png(&dir.path().join(format!("page_{:03}.png", page)), 85, 110);
    }
    pdfwtf::pdf::images_to_pdf(dir.path(), path, 100).unwrap();
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn flag_value<'a>(command: &'a ToolCommand, prefix: &str) -> Option<&'a str> {
    command.args.iter().find_map(|arg| arg.strip_prefix(prefix))
}

/// Stands in for gs, tesseract, unpaper, ocrmypdf and the browser by
/// producing the files each of them would write.
#[derive(Default)]
pub struct FakeTools {
    pub calls: Mutex<Vec<ToolCommand>>,
    pub unpaper_fails: bool,
    pub osd_rotation: u32,
}

impl FakeTools {
    pub fn programs(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.program_name()).collect()
    }

    pub fn count(&self, program: &str) -> usize {
        self.programs().iter().filter(|p| p.as_str() == program).count()
    }

    fn ghostscript(&self, command: &ToolCommand) -> CommandOutput {
        let pattern = flag_value(command, "-sOutputFile=").unwrap_or_default().to_string();
        let pdf = PathBuf::from(command.args.last().unwrap());
        let total = pdfwtf::pdf::count_pages(&pdf).unwrap();
        let last = flag_value(command, "-dLastPage=")
            .and_then(|v| v.parse().ok())
            .unwrap_or(total);
        for page in 1..=last.min(total) {
            let target = pattern.replace("%03d", &format!("{:03}", page));
            write_page_png(Path::new(&target), 85, 110);
        }
        ok("")
    }

    fn tesseract(&self, command: &ToolCommand) -> CommandOutput {
        if command.args.iter().any(|a| a == "--psm") {
            return ok(&format!("Page number: 0\nRotate: {}\n", self.osd_rotation));
        }
        // tesseract <image> <base> -l <lang> pdf
        let image = PathBuf::from(&command.args[0]);
        let base = PathBuf::from(&command.args[1]);
        let dir = base.with_extension("src");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::copy(&image, dir.join("page_001.png")).unwrap();
        pdfwtf::pdf::images_to_pdf(&dir, &base.with_extension("pdf"), 300).unwrap();
        ok("")
    }

    fn unpaper(&self, command: &ToolCommand) -> CommandOutput {
        if self.unpaper_fails {
            return failed("unpaper: simulated failure");
        }
        let n = command.args.len();
        let input = PathBuf::from(&command.args[n - 2]);
        let pattern = &command.args[n - 1];
        let sheets = match command.args.iter().position(|a| a == "--output-pages") {
            Some(i) if pattern.contains("%03d") => command.args[i + 1].parse::<u32>().unwrap(),
            _ => 1,
        };
        let page = image::open(&input).unwrap();
        for sheet in 1..=sheets {
            let output = pattern.replace("%03d", &format!("{:03}", sheet));
            page.save_with_format(&output, image::ImageFormat::Pnm).unwrap();
        }
        ok("")
    }

    fn copy_last_two(&self, command: &ToolCommand) -> CommandOutput {
        let n = command.args.len();
        std::fs::copy(&command.args[n - 2], &command.args[n - 1]).unwrap();
        ok("")
    }

    fn browser(&self, command: &ToolCommand) -> CommandOutput {
        let output = flag_value(command, "--print-to-pdf=").unwrap();
        write_text_pdf(Path::new(output), &["Rendered web page with enough words to count as text"]);
        ok("")
    }
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let output = match command.program_name().as_str() {
            "gs" => self.ghostscript(command),
            "tesseract" => self.tesseract(command),
            "unpaper" => self.unpaper(command),
            "ocrmypdf" => self.copy_last_two(command),
            "chromium" => self.browser(command),
            other => failed(&format!("{}: command not found", other)),
        };
        Ok(output)
    }
}
