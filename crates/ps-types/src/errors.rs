use thiserror::Error;

/// Main error type for the PixelSweep system
#[derive(Error, Debug)]
pub enum PsError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Dataset-related errors. All of these are fatal and abort the sweep
/// before any task is submitted.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Image directory not found: {path}")]
    DirectoryMissing { path: String },

    #[error("Image directory is empty: {path}")]
    EmptyDataset { path: String },

    #[error("Label file not found: {path}")]
    LabelFileMissing { path: String },

    #[error("Label count mismatch: {images} images but {labels} labels")]
    LabelMismatch { images: usize, labels: usize },

    #[error("Image filename is not a numeric label: {name}")]
    NonNumericName { name: String },

    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: String, message: String },
}

/// Per-candidate evaluation errors. Recoverable at the sweep level: the
/// candidate is recorded as failed and the rest of the sweep continues.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Candidate img_size must be at least 1, got {candidate}")]
    InvalidCandidate { candidate: u32 },

    #[error("PCA requested {components} components but only {available} are available")]
    ComponentOverflow { components: usize, available: usize },

    #[error("Train/test split left no {side} samples ({samples} total)")]
    EmptySplit { side: String, samples: usize },

    #[error("Classifier fit failed: {message}")]
    FitFailed { message: String },
}

/// Orchestrator-level errors
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("No candidate beat the initial error threshold; nothing to persist")]
    NoWinner,

    #[error("Failed to persist model to {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("Worker lost before reporting a result for candidate {candidate}")]
    WorkerLost { candidate: u32 },

    #[error("Timed out waiting for candidate {candidate} after {seconds} seconds")]
    TaskTimeout { candidate: u32, seconds: u64 },

    #[error("Pool is closed; no further submissions accepted")]
    PoolClosed,
}

/// Result type alias for PixelSweep operations
pub type PsResult<T> = Result<T, PsError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PsError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::LabelMismatch {
            images: 40,
            labels: 38,
        };

        assert!(error.to_string().contains("mismatch"));
        assert!(error.to_string().contains("40"));
        assert!(error.to_string().contains("38"));
    }

    #[test]
    fn test_error_conversion() {
        let eval_error = EvalError::ComponentOverflow {
            components: 7,
            available: 3,
        };
        let ps_error: PsError = eval_error.into();

        match ps_error {
            PsError::Eval(_) => (),
            _ => panic!("Expected Eval error"),
        }
    }

    #[test]
    fn test_config_macro() {
        let err = config_error!("Missing required field: {}", "image_dir");
        assert!(err.to_string().contains("image_dir"));
    }
}
