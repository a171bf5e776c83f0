use thiserror::Error;

/// Structured failures reported by the analysis stages.
///
/// Every failure is scoped to the single input being analyzed; nothing here is
/// fatal to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Empty or malformed raw input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The signal is shorter than the minimum analysis window of a stage.
    #[error("insufficient signal: need at least {required} samples, got {actual}")]
    InsufficientSignal { required: usize, actual: usize },
    /// Fewer than two beats, so no RR interval exists.
    #[error("insufficient data: need at least 2 beats, got {beats}")]
    InsufficientData { beats: usize },
    /// A configuration value outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The window classifier failed or returned an unusable probability.
    #[error("classifier failed on window {index}: {reason}")]
    Classifier { index: usize, reason: String },
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
