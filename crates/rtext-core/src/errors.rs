/// Input rejected before any accounting or gateway call happens.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("text is empty")]
    Empty,

    #[error("text is too long: {len} > {max} characters")]
    TooLong { len: usize, max: usize },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("target language is required for translation")]
    MissingTargetLanguage,
}

/// Infrastructure failures: startup, persistence and transport errors.
///
/// Validation and gateway failures never reach this type; the assistant turns
/// them into replies.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
