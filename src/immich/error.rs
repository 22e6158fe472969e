use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImmichError {
    #[error("Request to Immich failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Immich answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid Immich URL {0:?}")]
    InvalidUrl(String),
}
