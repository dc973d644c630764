use thiserror::Error;

/// Every way a bake can fail.
///
/// Clip-scoped errors abort only the clip being baked; the orchestrator
/// records them and moves on to the next clip.
#[derive(Error, Debug)]
pub enum BakeError {
    #[error("pose evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("topology mismatch: expected {expected} vertices, got {actual}")]
    TopologyMismatch { expected: usize, actual: usize },

    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    #[error("dispatch failure: {0}")]
    DispatchFailure(String),

    #[error("clip not found: {0}")]
    ClipNotFound(String),

    #[error("invalid clip '{clip}': {reason}")]
    InvalidClip { clip: String, reason: String },

    #[error("bake cancelled")]
    Cancelled,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BakeError {
    pub fn allocation<T: ToString>(msg: T) -> Self {
        BakeError::AllocationFailure(msg.to_string())
    }

    pub fn dispatch<T: ToString>(msg: T) -> Self {
        BakeError::DispatchFailure(msg.to_string())
    }

    pub fn persistence<T: ToString>(msg: T) -> Self {
        BakeError::Persistence(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BakeError>;
