use crate::chunking::build_chunks;
use crate::collection::{Retriever, VectorCollection};
use crate::embeddings::{BatchEmbeddings, EmbeddingClient};
use crate::error::CollectionError;
use crate::models::{BuildReport, ChunkingOptions, PageCollection, ScoredMatch};

/// Turns ingested pages into a queryable vector collection: split, embed
/// (batch-first, per-chunk fallback), index.
pub struct CollectionBuilder {
    embedder: EmbeddingClient,
    options: ChunkingOptions,
    collection: Option<VectorCollection>,
}

impl CollectionBuilder {
    pub fn new(embedder: EmbeddingClient) -> Self {
        Self {
            embedder,
            options: ChunkingOptions::default(),
            collection: None,
        }
    }

    pub fn with_options(mut self, options: ChunkingOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a fresh collection from the given pages, replacing any
    /// previous one. Fails with `NoDocuments` when there is nothing to
    /// index, and with the embedding error when the collaborator rejects a
    /// call.
    pub async fn build(&mut self, pages: &PageCollection) -> Result<BuildReport, CollectionError> {
        if pages.is_empty() {
            return Err(CollectionError::NoDocuments);
        }

        let chunks = build_chunks(pages.pages(), self.options)?;
        if chunks.is_empty() {
            // Every page was blank.
            return Err(CollectionError::NoDocuments);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let (embeddings, batch_embedded) = match self.embedder.embed_documents(&texts).await? {
            BatchEmbeddings::Vectors(vectors) => (vectors, true),
            BatchEmbeddings::Unsupported => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in &texts {
                    vectors.push(self.embedder.embed_query(text).await?);
                }
                (vectors, false)
            }
        };

        let collection = VectorCollection::from_embedded(chunks, embeddings)?;
        let report = BuildReport {
            chunk_count: collection.len(),
            batch_embedded,
        };
        self.collection = Some(collection);
        Ok(report)
    }

    pub fn collection(&self) -> Option<&VectorCollection> {
        self.collection.as_ref()
    }

    /// Relevance-ranked lookup handle for downstream consumers. `NotBuilt`
    /// until a build has succeeded.
    pub fn retriever(&self) -> Result<Retriever<'_>, CollectionError> {
        let collection = self.collection.as_ref().ok_or(CollectionError::NotBuilt)?;
        Ok(Retriever::new(collection, &self.embedder))
    }

    /// Embeds the query and returns the single highest-relevance chunk.
    pub async fn query(&self, text: &str) -> Result<ScoredMatch, CollectionError> {
        let collection = self.collection.as_ref().ok_or(CollectionError::NotBuilt)?;
        let query_vector = self.embedder.embed_query(text).await?;

        collection
            .search(&query_vector, 1)
            .into_iter()
            .next()
            .ok_or(CollectionError::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{CharacterNgramBackend, EmbeddingBackend};
    use crate::error::EmbedError;
    use crate::models::Page;
    use async_trait::async_trait;

    /// Collaborator with a native batch endpoint.
    struct BatchingBackend {
        inner: CharacterNgramBackend,
    }

    #[async_trait]
    impl EmbeddingBackend for BatchingBackend {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddings, EmbedError> {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.inner.embed(text).await?);
            }
            Ok(BatchEmbeddings::Vectors(vectors))
        }
    }

    /// Collaborator that rejects every call.
    struct RejectingBackend;

    #[async_trait]
    impl EmbeddingBackend for RejectingBackend {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Request("backend down".to_string()))
        }
    }

    fn pages(texts: &[&str]) -> PageCollection {
        let mut collection = PageCollection::new();
        collection.append(
            texts
                .iter()
                .enumerate()
                .map(|(index, text)| Page {
                    source_name: "notes.pdf".to_string(),
                    page_number: index as u32 + 1,
                    text: (*text).to_string(),
                })
                .collect(),
        );
        collection
    }

    #[tokio::test]
    async fn empty_pages_report_no_documents() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        let result = builder.build(&PageCollection::new()).await;
        assert!(matches!(result, Err(CollectionError::NoDocuments)));
        assert!(builder.collection().is_none());
    }

    #[tokio::test]
    async fn blank_pages_report_no_documents() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        let result = builder.build(&pages(&["   \n  "])).await;
        assert!(matches!(result, Err(CollectionError::NoDocuments)));
    }

    #[tokio::test]
    async fn query_before_build_reports_not_built() {
        let builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        assert!(matches!(
            builder.query("anything").await,
            Err(CollectionError::NotBuilt)
        ));
        assert!(matches!(
            builder.retriever().err(),
            Some(CollectionError::NotBuilt)
        ));
    }

    #[tokio::test]
    async fn batchless_backend_falls_back_to_per_chunk_embedding() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        let report = builder
            .build(&pages(&["first page text", "second page text"]))
            .await
            .unwrap();

        assert!(!report.batch_embedded);
        assert_eq!(report.chunk_count, 2);
        assert_eq!(builder.collection().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn batching_backend_embeds_in_one_call() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(BatchingBackend {
            inner: CharacterNgramBackend::default(),
        }));
        let report = builder
            .build(&pages(&["first page text", "second page text"]))
            .await
            .unwrap();

        assert!(report.batch_embedded);
        assert_eq!(report.chunk_count, 2);
    }

    #[tokio::test]
    async fn embedding_failure_surfaces_and_leaves_no_collection() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(RejectingBackend));
        let result = builder.build(&pages(&["some text"])).await;

        assert!(matches!(result, Err(CollectionError::Embed(_))));
        assert!(builder.collection().is_none());
    }

    #[tokio::test]
    async fn query_returns_the_highest_relevance_chunk() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        builder
            .build(&pages(&[
                "The mitochondria is the powerhouse of the cell.",
                "The Treaty of Westphalia ended the Thirty Years War.",
            ]))
            .await
            .unwrap();

        let best = builder.query("powerhouse of the cell").await.unwrap();
        assert!(best.chunk.text.contains("powerhouse of the cell"));

        // The reported score is the maximum across every stored chunk.
        let all = builder
            .retriever()
            .unwrap()
            .with_top_k(16)
            .retrieve("powerhouse of the cell")
            .await
            .unwrap();
        assert_eq!(all[0].chunk.chunk_id, best.chunk.chunk_id);
        assert!(all.iter().all(|candidate| candidate.score <= best.score));
    }

    #[tokio::test]
    async fn retriever_honors_top_k() {
        let mut builder = CollectionBuilder::new(EmbeddingClient::new(
            CharacterNgramBackend::default(),
        ));
        builder
            .build(&pages(&["alpha text", "beta text", "gamma text"]))
            .await
            .unwrap();

        let hits = builder
            .retriever()
            .unwrap()
            .with_top_k(2)
            .retrieve("alpha")
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }
}
