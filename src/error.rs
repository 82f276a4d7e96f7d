use thiserror::Error;

/// Everything that can go wrong between receiving a verification request and
/// returning a verdict. All variants except `Cleanup` surface as the uniform
/// 500 payload; `Cleanup` is logged at the call site and swallowed.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Failed to download video: {0}")]
    Download(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload Failed: {0}")]
    Upload(String),

    #[error("Video processing failed: {0}")]
    Processing(String),

    #[error("Timeout waiting for video processing")]
    ProcessingTimeout,

    #[error("Generate Failed: {0}")]
    Generation(String),

    #[error("Failed to parse Gemini JSON: {0}")]
    MalformedVerdict(String),

    #[error("Failed to delete remote file: {0}")]
    Cleanup(String),
}

impl VerifyError {
    /// Stage label used on the error counters.
    pub fn stage(&self) -> &'static str {
        match self {
            VerifyError::Download(_) => "download",
            VerifyError::Io(_) => "fs_write",
            VerifyError::Upload(_) => "upload",
            VerifyError::Processing(_) | VerifyError::ProcessingTimeout => "processing",
            VerifyError::Generation(_) => "generate",
            VerifyError::MalformedVerdict(_) => "parse",
            VerifyError::Cleanup(_) => "cleanup",
        }
    }
}
