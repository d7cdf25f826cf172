use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("slice config error: {0}")]
    SliceConfig(String),

    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog responded with status {status}: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("destination write failed: {0}")]
    BatchWrite(String),
}
