use thiserror::Error as ThisError;

/// Failures raised by the scoring engine.
#[derive(Debug, ThisError)]
pub enum ScoreError {
    #[error("no score dimension produced a highlight")]
    HighlightUnavailable,
}
