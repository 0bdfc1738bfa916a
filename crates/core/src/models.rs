use crate::error::CollectionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub source_name: String,
    pub page_number: u32,
    pub text: String,
}

/// Ordered pages accumulated across every upload of a session: upload order
/// first, page order within each file second. Append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCollection {
    pages: Vec<Page>,
}

impl PageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, pages: Vec<Page>) {
        self.pages.extend(pages);
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub chunk_id: String,
    pub source_name: String,
    pub page_number: u32,
    pub chunk_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub chunk: TextChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_chars: 1_000,
            overlap_chars: 200,
        }
    }
}

impl ChunkingOptions {
    pub fn validate(&self) -> Result<(), CollectionError> {
        if self.chunk_chars == 0 {
            return Err(CollectionError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.chunk_chars {
            return Err(CollectionError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.chunk_chars
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SkippedUpload {
    pub name: String,
    pub reason: String,
}

/// Outcome of one ingestion call. Files that failed to write or parse land
/// in `skipped`.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub pages: Vec<Page>,
    pub skipped: Vec<SkippedUpload>,
    pub ingested_at: DateTime<Utc>,
}

impl IngestionReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildReport {
    pub chunk_count: usize,
    /// False when the backend reported batch as unsupported and chunks were
    /// embedded one at a time.
    pub batch_embedded: bool,
}
