use thiserror::Error;

/// Reasons an upload is refused before any decoding happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("No file selected")]
    MissingFile,
    #[error("Uploaded file is empty")]
    EmptyFile,
    #[error("File type not allowed ({0}). Please use PNG, JPG, JPEG, or WEBP")]
    UnsupportedFormat(String),
    #[error("File too large ({size} bytes). Maximum size is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("Input rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Failed to paint region: {0}")]
    Paint(String),
    #[error("Stats store failure: {0}")]
    Store(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RedactError {
    /// Short machine-readable class, stored alongside failed records.
    pub fn kind(&self) -> &'static str {
        match self {
            RedactError::Rejected(_) => "rejected",
            RedactError::Decode(_) => "decode",
            RedactError::Encode(_) => "encode",
            RedactError::Paint(_) => "paint",
            RedactError::Store(_) => "store",
            RedactError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_converts_into_redact_error() {
        let err: RedactError = Rejection::TooLarge { size: 20, max: 10 }.into();
        assert_eq!(err.kind(), "rejected");
        assert!(err.to_string().contains("Maximum size is 10 bytes"));
    }
}
