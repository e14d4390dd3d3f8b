pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod fetch;
pub mod imaging;
pub mod pdf;
pub mod text;
pub mod tools;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{Environment, TomlConfig};

pub use app::pipelines::PdfPipeline;
pub use core::engine::PdfEngine;
pub use domain::model::{InputSource, ProcessOptions, ProcessReport};
pub use tools::SystemRunner;
pub use utils::error::{PdfError, Result};
