use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("download of {url} returned status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("{url} does not serve a pdf (content-type: {content_type})")]
    NotPdf { url: String, content_type: String },

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("no text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("cleaned text produced no chunks for {0}")]
    NoChunks(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("tokenization error: {0}")]
    Tokenize(String),

    #[error("inference error: {0}")]
    Inference(String),
}

impl From<candle_core::Error> for EmbedError {
    fn from(error: candle_core::Error) -> Self {
        Self::Inference(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

pub type Result<T, E = ProcessError> = std::result::Result<T, E>;
