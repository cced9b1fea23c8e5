use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("merge request already exists")]
  MergeRequestAlreadyExists,
  #[error("unable to reach GitLab: {0}")]
  Connection(String),
  #[error("GitLab responded with {status}: {message}")]
  Api { status: u16, message: String },
  #[error(transparent)]
  Http(reqwest::Error),
  #[error(transparent)]
  Url(#[from] url::ParseError),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
  #[error("invalid configuration: {0}")]
  Config(String),
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    // Anything that broke while sending the request or reading the body is a
    // transport failure; only builder, decode and status errors stay `Http`.
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
      Error::Connection(err.to_string())
    } else {
      Error::Http(err)
    }
  }
}
