use crate::error::CollectionError;
use crate::models::{ChunkingOptions, Page, TextChunk};
use sha2::{Digest, Sha256};

/// Splits one page's text into overlapping pieces of at most
/// `options.chunk_chars` characters. Windows prefer to end just after their
/// last newline, but the next window always starts exactly
/// `options.overlap_chars` before the previous end, so the carried-over
/// region is the full configured overlap wherever the newline snap landed.
pub fn split_page_text(
    text: &str,
    options: ChunkingOptions,
) -> Result<Vec<String>, CollectionError> {
    options.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= options.chunk_chars {
        return Ok(vec![text.to_string()]);
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + options.chunk_chars).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            // The snap floor keeps every window longer than the overlap, so
            // the split always advances.
            newline_snap(&chars, start + options.overlap_chars + 1, hard_end)
        };

        pieces.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start = end - options.overlap_chars;
    }

    Ok(pieces)
}

fn newline_snap(chars: &[char], floor: usize, hard_end: usize) -> usize {
    chars[floor..hard_end]
        .iter()
        .rposition(|candidate| *candidate == '\n')
        .map(|offset| floor + offset + 1)
        .unwrap_or(hard_end)
}

/// Splits every page into chunks, numbering them with one monotonically
/// increasing index across the whole build. A chunk never spans two pages.
pub fn build_chunks(
    pages: &[Page],
    options: ChunkingOptions,
) -> Result<Vec<TextChunk>, CollectionError> {
    options.validate()?;

    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for page in pages {
        for piece in split_page_text(&page.text, options)? {
            let chunk_id = make_chunk_id(&page.source_name, page.page_number, cursor, &piece);
            chunks.push(TextChunk {
                chunk_id,
                source_name: page.source_name.clone(),
                page_number: page.page_number,
                chunk_index: cursor,
                text: piece,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}

fn make_chunk_id(source_name: &str, page_number: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(page_number.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
