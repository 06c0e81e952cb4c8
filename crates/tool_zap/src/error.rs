use thiserror::Error;
use titan_common::TitanError;

#[derive(Error, Debug)]
pub enum ZapError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ZAP API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed ZAP response: {0}")]
    Malformed(String),
}

impl From<ZapError> for TitanError {
    fn from(err: ZapError) -> Self {
        TitanError::Remote(err.to_string())
    }
}
