pub mod builder;
pub mod chunking;
pub mod collection;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod session;

pub use builder::CollectionBuilder;
pub use chunking::{build_chunks, split_page_text};
pub use collection::{Retriever, VectorCollection, DEFAULT_RETRIEVER_TOP_K};
pub use embeddings::{
    BatchEmbeddings, CharacterNgramBackend, EmbeddingBackend, EmbeddingClient, VertexAiBackend,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{CollectionError, EmbedError, IngestError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{ingest_uploads, read_uploads_from_dir};
pub use models::{
    BuildReport, ChunkingOptions, IngestionReport, Page, PageCollection, ScoredMatch,
    SkippedUpload, TextChunk, UploadedFile,
};
pub use session::PipelineSession;
