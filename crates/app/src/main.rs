use chrono::Utc;
use clap::{Parser, Subcommand};
use quiz_corpus_core::{
    ingest_uploads, read_uploads_from_dir, CharacterNgramBackend, EmbeddingClient, LopdfExtractor,
    PipelineSession, UploadedFile, VertexAiBackend,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quiz-corpus", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding model name.
    #[arg(long, default_value = "textembedding-gecko@003")]
    model: String,

    /// Cloud project that hosts the embedding model.
    #[arg(long, env = "VERTEX_PROJECT")]
    project: Option<String>,

    /// Cloud region of the embedding model.
    #[arg(long, default_value = "us-central1")]
    location: String,

    /// Use the deterministic local embedder instead of the remote model.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest PDF uploads and report page totals.
    Ingest {
        /// PDF files to ingest.
        files: Vec<PathBuf>,

        /// Also ingest every PDF found under this folder, recursively.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Ingest PDFs, build the vector collection, and answer a query.
    Ask {
        /// Query text to match against the ingested passages.
        #[arg(long)]
        query: String,

        /// PDF files to ingest.
        files: Vec<PathBuf>,

        /// Also ingest every PDF found under this folder, recursively.
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Number of context passages to list alongside the best match.
        #[arg(long, default_value = "1")]
        top_k: usize,
    },
    /// Embed a single string and report its dimensions.
    Embed {
        /// Text to embed.
        #[arg(long)]
        text: String,
    },
}

fn embedding_client(cli: &Cli) -> anyhow::Result<EmbeddingClient> {
    if cli.offline {
        return Ok(EmbeddingClient::new(CharacterNgramBackend::default()));
    }

    let project = cli
        .project
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--project is required unless --offline is set"))?;
    let backend = VertexAiBackend::new(&cli.model, project, &cli.location)?;
    Ok(EmbeddingClient::new(backend))
}

fn gather_uploads(
    files: &[PathBuf],
    folder: Option<&PathBuf>,
) -> anyhow::Result<Vec<UploadedFile>> {
    let mut uploads = Vec::new();

    for path in files {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?
            .to_string();
        uploads.push(UploadedFile::new(name, std::fs::read(path)?));
    }

    if let Some(folder) = folder {
        uploads.extend(read_uploads_from_dir(folder)?);
    }

    anyhow::ensure!(!uploads.is_empty(), "no PDF uploads supplied");
    Ok(uploads)
}

fn report_skips(session: &PipelineSession<LopdfExtractor>) {
    for skipped in session.skipped() {
        warn!(upload = %skipped.name, reason = %skipped.reason, "skipped upload");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "quiz-corpus boot"
    );

    match &cli.command {
        Command::Ingest { files, folder } => {
            let uploads = gather_uploads(files, folder.as_ref())?;
            let report = ingest_uploads(&uploads, &LopdfExtractor);

            for skipped in &report.skipped {
                warn!(upload = %skipped.name, reason = %skipped.reason, "skipped upload");
            }
            info!(
                ingested_at = %report.ingested_at.to_rfc3339(),
                pages = report.page_count(),
                "ingestion complete"
            );

            println!(
                "Total pages processed: {} ({} upload(s), {} skipped)",
                report.page_count(),
                uploads.len() - report.skipped.len(),
                report.skipped.len()
            );
        }
        Command::Ask {
            query,
            files,
            folder,
            top_k,
        } => {
            let uploads = gather_uploads(files, folder.as_ref())?;
            let mut session = PipelineSession::new(LopdfExtractor, embedding_client(&cli)?);

            session.ingest(&uploads);
            report_skips(&session);
            println!("Total pages processed: {}", session.page_count());

            let build = session.build_collection().await?;
            println!(
                "Collection built: {} chunks ({} embedding)",
                build.chunk_count,
                if build.batch_embedded {
                    "batch"
                } else {
                    "per-chunk"
                }
            );

            let best = session.query(query).await?;
            println!(
                "[score={:.4}] {} page {}",
                best.score, best.chunk.source_name, best.chunk.page_number
            );
            println!("{}", best.chunk.text);

            if *top_k > 1 {
                let context = session
                    .retriever()?
                    .with_top_k(*top_k)
                    .retrieve(query)
                    .await?;
                for (rank, hit) in context.iter().enumerate() {
                    println!(
                        "context {}: [score={:.4}] {} page {} chunk {}",
                        rank + 1,
                        hit.score,
                        hit.chunk.source_name,
                        hit.chunk.page_number,
                        hit.chunk.chunk_index
                    );
                }
            }
        }
        Command::Embed { text } => {
            let client = embedding_client(&cli)?;
            let vector = client.embed_query(text).await?;
            println!(
                "Embedded {} chars into {} dimensions",
                text.chars().count(),
                vector.len()
            );
        }
    }

    Ok(())
}
