use thiserror::Error;

/// Errors constructing an [`crate::HttpEventSource`].
#[derive(Debug, Error)]
pub enum SourceBuildError {
    #[error("source base URL is empty")]
    EmptyBaseUrl,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
