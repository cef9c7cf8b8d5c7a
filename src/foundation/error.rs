use std::path::PathBuf;

/// Result alias used across the crate.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors produced while loading images, scoring pairs and writing tables.
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    /// Bad configuration or input that fails a precondition.
    #[error("validation error: {0}")]
    Validation(String),

    /// A scene or output directory that does not exist.
    #[error("missing directory: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// An image that is missing, undecodable or has the wrong shape.
    #[error("image error: {0}")]
    Image(String),

    /// A metric backend failed to produce a value.
    #[error("metric error: {0}")]
    Metric(String),

    /// Filesystem failure outside image decoding.
    #[error("io error: {0}")]
    Io(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A renderer or scorer process failed.
    #[error("external program error: {0}")]
    External(String),

    /// Any other error carried through `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvalError {
    /// Build a [`EvalError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EvalError::MissingDirectory`] value.
    pub fn missing_directory(path: impl Into<PathBuf>) -> Self {
        Self::MissingDirectory(path.into())
    }

    /// Build a [`EvalError::Image`] value.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    /// Build a [`EvalError::Metric`] value.
    pub fn metric(msg: impl Into<String>) -> Self {
        Self::Metric(msg.into())
    }

    /// Build a [`EvalError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`EvalError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`EvalError::External`] value.
    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }

    /// Directory-level absence is the one failure batch runs recover from by skipping.
    pub fn is_missing_directory(&self) -> bool {
        matches!(self, Self::MissingDirectory(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
