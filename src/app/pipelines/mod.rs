pub mod pdf_pipeline;

pub use pdf_pipeline::PdfPipeline;
