use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum CaptureError {
    #[error("io failure: {0}")]
    Io(String),
    #[error("encode failure: {0}")]
    Encode(String),
    #[error("image decode failure: {0}")]
    Image(String),
    #[error("summary failure: {0}")]
    Summary(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}

impl From<csv::Error> for CaptureError {
    fn from(err: csv::Error) -> Self {
        CaptureError::Summary(err.to_string())
    }
}
