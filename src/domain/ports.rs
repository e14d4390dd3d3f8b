use crate::domain::model::{ProcessReport, WorkingDocument};
use crate::tools::command::{CommandOutput, ToolCommand};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Executes external programs. The system implementation spawns processes;
/// tests substitute recorders that fake tool output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn prepare(&self) -> Result<WorkingDocument>;
    async fn transform(&self, document: WorkingDocument) -> Result<WorkingDocument>;
    async fn load(&self, document: WorkingDocument) -> Result<ProcessReport>;
}
