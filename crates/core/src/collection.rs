use crate::embeddings::EmbeddingClient;
use crate::error::{CollectionError, EmbedError};
use crate::models::{ScoredMatch, TextChunk};

pub const DEFAULT_RETRIEVER_TOP_K: usize = 4;

/// Session-scoped store of (chunk, embedding) pairs. Built once, queried
/// many times, gone when the session drops.
pub struct VectorCollection {
    entries: Vec<(TextChunk, Vec<f32>)>,
}

impl VectorCollection {
    /// Pairs chunks with their vectors. Refuses mismatched lengths and an
    /// empty set, so a constructed collection is always queryable.
    pub fn from_embedded(
        chunks: Vec<TextChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, CollectionError> {
        if chunks.len() != embeddings.len() {
            return Err(CollectionError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            return Err(CollectionError::NoDocuments);
        }

        Ok(Self {
            entries: chunks.into_iter().zip(embeddings).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scores every stored chunk against the query vector by cosine
    /// similarity and returns the best `top_k`, highest first.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Vec<ScoredMatch> {
        let mut matches: Vec<ScoredMatch> = self
            .entries
            .iter()
            .map(|(chunk, embedding)| ScoredMatch {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vector, embedding),
            })
            .collect();

        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(top_k);
        matches
    }
}

/// Zero-magnitude or mismatched-dimension pairs score 0.0; ordering among
/// real vectors is unaffected.
fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }

    let mut dot = 0f32;
    let mut left_norm = 0f32;
    let mut right_norm = 0f32;
    for (l, r) in left.iter().zip(right.iter()) {
        dot += l * r;
        left_norm += l * l;
        right_norm += r * r;
    }

    let magnitude = left_norm.sqrt() * right_norm.sqrt();
    if magnitude > 0.0 {
        dot / magnitude
    } else {
        0.0
    }
}

/// Relevance-ranked lookup handle over a built collection, for downstream
/// consumers that want more than the single best match.
pub struct Retriever<'a> {
    collection: &'a VectorCollection,
    embedder: &'a EmbeddingClient,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    pub(crate) fn new(collection: &'a VectorCollection, embedder: &'a EmbeddingClient) -> Self {
        Self {
            collection,
            embedder,
            top_k: DEFAULT_RETRIEVER_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub async fn retrieve(&self, text: &str) -> Result<Vec<ScoredMatch>, EmbedError> {
        let query_vector = self.embedder.embed_query(text).await?;
        Ok(self.collection.search(&query_vector, self.top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u64, text: &str) -> TextChunk {
        TextChunk {
            chunk_id: format!("chunk-{index}"),
            source_name: "notes.pdf".to_string(),
            page_number: 1,
            chunk_index: index,
            text: text.to_string(),
        }
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let collection = VectorCollection::from_embedded(
            vec![chunk(0, "off-axis"), chunk(1, "aligned")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
        )
        .unwrap();

        let matches = collection.search(&[1.0, 0.1], 2);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].chunk.text, "aligned");
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn search_truncates_to_top_k() {
        let collection = VectorCollection::from_embedded(
            vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
            vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]],
        )
        .unwrap();

        assert_eq!(collection.search(&[1.0, 0.0], 1).len(), 1);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = VectorCollection::from_embedded(vec![chunk(0, "a")], Vec::new());
        assert!(matches!(
            result,
            Err(CollectionError::CountMismatch {
                chunks: 1,
                embeddings: 0
            })
        ));
    }

    #[test]
    fn empty_collection_is_rejected() {
        let result = VectorCollection::from_embedded(Vec::new(), Vec::new());
        assert!(matches!(result, Err(CollectionError::NoDocuments)));
    }

    #[test]
    fn zero_magnitude_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
