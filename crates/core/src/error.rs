use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("upload has no usable file name: {0}")]
    MissingFileName(String),

    #[error("unsupported upload type (only .pdf is accepted): {0}")]
    UnsupportedUpload(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("no documents have been ingested")]
    NoDocuments,

    #[error("collection has not been built yet")]
    NotBuilt,

    #[error("no matching chunks for query")]
    NoMatch,

    #[error("chunk count {chunks} does not match embedding count {embeddings}")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
