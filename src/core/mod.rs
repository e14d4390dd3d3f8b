pub mod engine;
pub mod pages;

pub use crate::domain::model::{ProcessOptions, ProcessReport, WorkingDocument};
pub use crate::domain::ports::{CommandRunner, Pipeline};
pub use crate::utils::error::Result;
