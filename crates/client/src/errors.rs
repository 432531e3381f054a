use reqwest::StatusCode;
use thiserror::Error;

/// Failures a caller of the group API can observe.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("http status {0}")]
    Http(StatusCode),
    #[error("{0}")]
    Api(String),
}
