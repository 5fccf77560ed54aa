use thiserror::Error;

/// Main error type for the sheet merger.
/// Aggregates errors from the standard library and dependencies.
/// Per-file parse failures never surface here; they are folded into the merge report.
#[derive(Error, Debug)]
pub enum MergerError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    ConfigError(#[from] toml::de::Error),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, MergerError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| MergerError::WithContextError(format!("{}: {}", message, e)))
    }
}
