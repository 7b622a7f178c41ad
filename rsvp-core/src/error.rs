use thiserror::Error;

/// Errors that prevent a trial from starting. Anything recoverable mid-trial
/// (empty recall, fullscreen loss) is a state transition, not an error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrialError {
    /// No sentence text to present; the trial refuses to run with empty
    /// content.
    #[error("no sentence text to present")]
    EmptySentence,

    #[error("invalid trial configuration: {0}")]
    InvalidConfig(String),
}

/// A result-sink write was rejected. The controller logs this and proceeds;
/// persistence failures must not stall the trial flow.
#[derive(Error, Debug)]
#[error("result sink rejected '{key}': {message}")]
pub struct SinkError {
    pub key: String,
    pub message: String,
}

impl SinkError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}
