use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {url}: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Invalid CA certificate {path}: {reason}")]
    Certificate { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Injected failure on {0}")]
    Injected(&'static str),
}

impl Error {
    pub(crate) fn request(url: &reqwest::Url, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
