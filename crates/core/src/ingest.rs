use crate::error::IngestError;
use crate::extractor::PdfExtractor;
use crate::models::{IngestionReport, Page, SkippedUpload, UploadedFile};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// An upload's bytes materialized on disk. The file exists only while this
/// guard does: `Drop` removes it on every exit path, parse failures
/// included.
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    fn materialize(file: &UploadedFile) -> Result<Self, IngestError> {
        let original = Path::new(&file.name);
        let stem = original
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| IngestError::MissingFileName(file.name.clone()))?;
        let extension = original
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("pdf");

        // The v4 suffix keeps same-named uploads from colliding on disk.
        let unique = Uuid::new_v4().simple();
        let path = std::env::temp_dir().join(format!("{stem}_{unique}.{extension}"));
        fs::write(&path, &file.bytes)?;

        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Extracts pages from every upload, in upload order. A file that fails to
/// write or parse becomes a `SkippedUpload` entry; pages already gathered
/// from other files are unaffected.
pub fn ingest_uploads(files: &[UploadedFile], extractor: &impl PdfExtractor) -> IngestionReport {
    let mut pages = Vec::new();
    let mut skipped = Vec::new();

    for file in files {
        match ingest_one(file, extractor) {
            Ok(mut file_pages) => pages.append(&mut file_pages),
            Err(error) => skipped.push(SkippedUpload {
                name: file.name.clone(),
                reason: error.to_string(),
            }),
        }
    }

    IngestionReport {
        pages,
        skipped,
        ingested_at: Utc::now(),
    }
}

fn ingest_one(
    file: &UploadedFile,
    extractor: &impl PdfExtractor,
) -> Result<Vec<Page>, IngestError> {
    if !file.is_pdf() {
        return Err(IngestError::UnsupportedUpload(file.name.clone()));
    }

    let temp = TempUpload::materialize(file)?;
    let extracted = extractor.extract_pages(temp.path())?;

    Ok(extracted
        .into_iter()
        .map(|page| Page {
            source_name: file.name.clone(),
            page_number: page.number,
            text: page.text,
        })
        .collect())
}

/// Reads every `.pdf` under `folder` (recursively, case-insensitively,
/// sorted by path) into upload blobs.
pub fn read_uploads_from_dir(folder: &Path) -> Result<Vec<UploadedFile>, IngestError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            paths.push(entry.path().to_path_buf());
        }
    }

    paths.sort_unstable();

    let mut uploads = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();
        uploads.push(UploadedFile::new(name, fs::read(&path)?));
    }

    Ok(uploads)
}
