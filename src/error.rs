use thiserror::Error;

/// Main error type for the Lumina-Compositor library
#[derive(Error, Debug)]
pub enum LuminaError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Per-frame errors, always recoverable at the pipeline level
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Correction failed on frame {index}: {reason}")]
    CorrectionFailed { index: u64, reason: String },

    #[error("Watermark layout failed: {reason}")]
    LayoutFailed { reason: String },
}

/// Frame source (decoder) errors, fatal to the job
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open media source: {path}")]
    OpenFailed { path: String },

    #[error("Failed to probe media source: {path} - {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Unsupported media format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Decode failed: {reason}")]
    DecodeFailed { reason: String },
}

/// Frame sink (encoder) errors, fatal to the job
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to create media sink: {path}")]
    CreateFailed { path: String },

    #[error("Encode failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Write failed at frame {index}: {reason}")]
    WriteFailed { index: u64, reason: String },
}

/// Executor and job orchestration errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Worker pool failed: {reason}")]
    WorkerPoolFailed { reason: String },

    #[error("Frame ordering violated at index {index}")]
    OrderingViolated { index: u64 },

    #[error("No input media provided")]
    NoInput,

    #[error("Invalid pipeline parameters: {details}")]
    InvalidParameters { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using LuminaError
pub type Result<T> = std::result::Result<T, LuminaError>;

impl LuminaError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the error can be absorbed by substituting the original frame
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::Frame(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(SourceError::OpenFailed { path }) => {
                format!("Could not open '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Sink(SinkError::CreateFailed { path }) => {
                format!("Could not create output '{}'. Please check the directory is writable.", path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
