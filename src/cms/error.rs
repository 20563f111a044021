//! Content client errors

use thiserror::Error;

/// Errors returned by a `ContentSource`
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMS returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("CMS API exposes no master ref")]
    NoMasterRef,

    #[error("Page URL does not belong to the content source: {0}")]
    ForeignPageUrl(String),
}

impl CmsError {
    /// Whether the error was caused by the caller's input rather than the CMS
    pub fn is_bad_request(&self) -> bool {
        matches!(self, CmsError::ForeignPageUrl(_))
    }
}
