use chrono::Utc;
use clap::{Parser, Subcommand};
use paper_search_core::{
    api, embed_many, DocumentProcessor, EmbeddingConfig, EmbeddingModel, HashedNgramEmbedder,
    ProcessorOptions, PublicationRecord, QdrantStore, QueryPredictor, SearchService, TextEmbedder,
    VectorIndex,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "paper-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "publications")]
    qdrant_collection: String,

    /// Directory holding tokenizer.json, config.json and the encoder weights
    #[arg(long, env = "MODEL_DIR", default_value = "models/all-MiniLM-L6-v2")]
    model_dir: PathBuf,

    /// Token budget for the encoder; longer inputs are truncated
    #[arg(long, env = "MAX_TOKENS", default_value = "512")]
    max_tokens: usize,

    /// Directory where downloaded PDFs are persisted
    #[arg(long, env = "PDF_FOLDER", default_value = "data/pdf_files")]
    pdf_folder: PathBuf,

    /// Character budget per text chunk
    #[arg(long, env = "PDF_CHUNK_SIZE", default_value = "1000")]
    chunk_size: usize,

    /// Use the deterministic hashing embedder instead of loading model
    /// weights. Vectors are not semantic; for smoke runs only.
    #[arg(long, default_value_t = false)]
    stub_embedder: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Download PDFs, chunk and embed their text, and index the vectors.
    Ingest {
        /// PDF URLs to process.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Embed a query and print the nearest indexed chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of hits to return.
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Serve the search and prediction endpoints.
    Serve {
        /// Address to bind.
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let embedder = build_embedder(&cli)?;
    let store = QdrantStore::new(
        &cli.qdrant_url,
        &cli.qdrant_collection,
        embedder.dimensions(),
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "paper-search boot"
    );

    match cli.command {
        Command::Ingest { urls } => {
            let processor = DocumentProcessor::new(ProcessorOptions {
                pdf_dir: cli.pdf_folder.clone(),
                max_chunk_chars: cli.chunk_size,
                fetch_timeout: Duration::from_secs(30),
            })?;
            store.ensure_collection().await?;

            let outcomes = tokio::task::block_in_place(|| processor.process_all(&urls));

            let mut indexed_chunks = 0usize;
            let mut failed_documents = 0usize;
            let mut failed_chunks = 0usize;

            for outcome in outcomes {
                let document = match outcome {
                    Ok(document) => document,
                    Err(_) => {
                        failed_documents += 1;
                        continue;
                    }
                };

                let embeddings = tokio::task::block_in_place(|| {
                    embed_many(embedder.as_ref(), &document.chunks)
                });

                let mut records = Vec::new();
                let mut vectors = Vec::new();
                for (index, (chunk, embedding)) in
                    document.chunks.iter().zip(embeddings).enumerate()
                {
                    match embedding {
                        Ok(vector) => {
                            records.push(PublicationRecord::from_document_chunk(
                                &document, index, chunk,
                            ));
                            vectors.push(vector);
                        }
                        Err(_) => failed_chunks += 1,
                    }
                }

                store.index_records(&records, &vectors).await?;
                indexed_chunks += records.len();
                info!(
                    url = %document.url,
                    chunks = records.len(),
                    hash = %document.hash,
                    "document indexed"
                );
            }

            println!(
                "{} chunks indexed from {} of {} documents at {}",
                indexed_chunks,
                urls.len() - failed_documents,
                urls.len(),
                Utc::now().to_rfc3339()
            );
            if failed_documents > 0 {
                println!("{failed_documents} document(s) skipped");
            }
            if failed_chunks > 0 {
                println!("{failed_chunks} chunk(s) skipped after embedding failures");
            }
        }
        Command::Search { query, limit } => {
            let query_vector = tokio::task::block_in_place(|| embedder.embed(&query))?;
            let hits = store.search_vector(&query_vector, limit).await?;

            println!("query: {query}");
            for scored in hits {
                println!(
                    "[{:.4}] {} doi={}",
                    scored.score,
                    scored.hit.title,
                    if scored.hit.doi.is_empty() {
                        "-"
                    } else {
                        scored.hit.doi.as_str()
                    }
                );
                if let Some(authors) = &scored.hit.authors {
                    println!("  authors: {authors}");
                }
                if let Some(summary) = &scored.hit.summary {
                    println!("  summary: {summary}");
                }
            }
        }
        Command::Serve { bind } => {
            let service = Arc::new(SearchService {
                embedder,
                index: Arc::new(store),
                predictor: Arc::new(QueryPredictor::new()),
            });

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!(addr = %bind, "serving search api");
            api::serve(listener, service).await?;
        }
    }

    Ok(())
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    if cli.stub_embedder {
        warn!("using hashed n-gram stub embedder; vectors are not semantic");
        return Ok(Arc::new(HashedNgramEmbedder::default()));
    }

    let model = EmbeddingModel::load(EmbeddingConfig {
        model_dir: cli.model_dir.clone(),
        max_tokens: cli.max_tokens,
    })?;
    Ok(Arc::new(model))
}
