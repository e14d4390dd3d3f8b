use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid page range '{input}': {reason}")]
    PageRangeError { input: String, reason: String },

    #[error("External tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("{program} failed (exit code {code:?})\nCommand: {command}\nOutput:\n{output}")]
    ToolFailed {
        program: String,
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    ExternalTool,
    Network,
    Document,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PdfError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::PageRangeError { .. } | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::ToolNotFound { .. } | Self::ToolFailed { .. } => ErrorCategory::ExternalTool,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::PdfError(_)
            | Self::ImageError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. } => ErrorCategory::Document,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::ExternalTool | ErrorCategory::Document => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ToolNotFound { program } => format!(
                "Install '{}' or point PDFWTF_HOME_DIR / the [tools] config section at it; run with --check-tools to verify",
                program
            ),
            Self::ToolFailed { program, .. } if program.contains("unpaper") => {
                "Check the unpaper installation, or use --unpaper-runner docker with the unpaper-alpine image".to_string()
            }
            Self::ToolFailed { .. } => {
                "Re-run with --debug to keep temporary files and inspect the tool output".to_string()
            }
            Self::PageRangeError { .. } => {
                "Use comma separated pages or ranges such as '1-3,5' or '7-'".to_string()
            }
            Self::HttpError(_) => "Check the URL and your network connection, then retry".to_string(),
            Self::PdfError(_) => "Make sure the input is a valid, unencrypted PDF".to_string(),
            Self::TomlError(_) => "Fix the syntax of the TOML configuration file".to_string(),
            Self::IoError(_) => {
                "Check file permissions and free disk space in the output and temp directories".to_string()
            }
            _ => match self.category() {
                ErrorCategory::Configuration => "Review the command line options and configuration file".to_string(),
                _ => "Re-run with --verbose for more details".to_string(),
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ToolNotFound { program } => {
                format!("The external program '{}' could not be started", program)
            }
            Self::ToolFailed { program, code, .. } => {
                format!("'{}' exited unsuccessfully (code {:?})", program, code)
            }
            Self::PdfError(e) => format!("The PDF could not be read or written: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_category() {
        let missing = PdfError::ToolNotFound {
            program: "gs".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::ExternalTool);
        assert_eq!(missing.severity(), ErrorSeverity::High);

        let io = PdfError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_unpaper_failure_suggests_docker() {
        let err = PdfError::ToolFailed {
            program: "unpaper".to_string(),
            command: "unpaper -v in.png out.pnm".to_string(),
            code: Some(1),
            output: String::new(),
        };
        assert!(err.recovery_suggestion().contains("docker"));
        assert!(err.to_string().contains("Command: unpaper -v in.png out.pnm"));
    }
}
