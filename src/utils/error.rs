use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RbsyncError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Mapping is empty, nothing to export")]
    EmptyMapping,

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {role} volume loaded")]
    VolumeNotLoaded { role: String },

    #[error("Malformed mapping: {message}")]
    Format { message: String },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("NIfTI error at {}: {message}", path.display())]
    Nifti { path: PathBuf, message: String },

    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfig { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RbsyncError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::VolumeNotLoaded { .. } => ErrorCategory::Input,
            Self::EmptyMapping
            | Self::Format { .. }
            | Self::Csv(_)
            | Self::Serialization(_)
            | Self::Nifti { .. } => ErrorCategory::Data,
            Self::Io { .. } => ErrorCategory::Storage,
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::EmptyMapping => ErrorSeverity::Low,
            Self::InvalidInput { .. } | Self::VolumeNotLoaded { .. } => ErrorSeverity::Medium,
            Self::Format { .. }
            | Self::Csv(_)
            | Self::Serialization(_)
            | Self::Nifti { .. }
            | Self::Config { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => ErrorSeverity::High,
            Self::Io { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "Check the axis and slice indices against the loaded volumes",
            Self::EmptyMapping => "Match slices first, then export",
            Self::Io { .. } => "Check that the destination exists and is writable",
            Self::VolumeNotLoaded { .. } => "Load both the source volume and the atlas first",
            Self::Format { .. } | Self::Csv(_) | Self::Serialization(_) => {
                "Make sure the mapping file was written by rbsync and has not been edited by hand"
            }
            Self::Nifti { .. } => "Make sure the file is a valid .nii or .nii.gz volume",
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                "Fix the session configuration file and try again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyMapping => "No mapping to export. Match slices first.".to_string(),
            Self::VolumeNotLoaded { .. } => "Load both the source volume and the atlas first".to_string(),
            Self::Io { path, .. } => format!("Could not access {}", path.display()),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RbsyncError>;
