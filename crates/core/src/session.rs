use crate::builder::CollectionBuilder;
use crate::collection::Retriever;
use crate::embeddings::EmbeddingClient;
use crate::error::CollectionError;
use crate::extractor::PdfExtractor;
use crate::ingest::ingest_uploads;
use crate::models::{
    BuildReport, ChunkingOptions, IngestionReport, PageCollection, ScoredMatch, SkippedUpload,
    UploadedFile,
};

/// One user session's pipeline state: the accumulated pages, the running
/// skip list, and the vector collection once built. Created per session,
/// destroyed by drop; nothing outlives it.
pub struct PipelineSession<X: PdfExtractor> {
    extractor: X,
    pages: PageCollection,
    skipped: Vec<SkippedUpload>,
    builder: CollectionBuilder,
}

impl<X: PdfExtractor> PipelineSession<X> {
    pub fn new(extractor: X, embedder: EmbeddingClient) -> Self {
        Self {
            extractor,
            pages: PageCollection::new(),
            skipped: Vec::new(),
            builder: CollectionBuilder::new(embedder),
        }
    }

    pub fn with_chunking_options(mut self, options: ChunkingOptions) -> Self {
        self.builder = self.builder.with_options(options);
        self
    }

    /// Extracts pages from one batch of uploads and appends them to the
    /// session's collection, upload order first, page order second. Returns
    /// the batch's own report; skips accumulate on the session as well.
    pub fn ingest(&mut self, files: &[UploadedFile]) -> IngestionReport {
        let report = ingest_uploads(files, &self.extractor);
        self.pages.append(report.pages.clone());
        self.skipped.extend(report.skipped.iter().cloned());
        report
    }

    /// Chunks, embeds, and indexes everything ingested so far.
    pub async fn build_collection(&mut self) -> Result<BuildReport, CollectionError> {
        self.builder.build(&self.pages).await
    }

    /// Single best match for the query, once a collection exists.
    pub async fn query(&self, text: &str) -> Result<ScoredMatch, CollectionError> {
        self.builder.query(text).await
    }

    pub fn retriever(&self) -> Result<Retriever<'_>, CollectionError> {
        self.builder.retriever()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn skipped(&self) -> &[SkippedUpload] {
        &self.skipped
    }
}
