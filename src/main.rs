use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faq_rag::config::Config;
use faq_rag::mcp_server::RagMcpServer;
use faq_rag::{RagClient, SearchRequest, SourceType};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "faq-rag",
    version = VERSION,
    about = "Chunk, embed and search FAQ documents; serves MCP over stdio by default"
)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config location)
    #[arg(long, global = true, env = "FAQ_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over stdio
    Serve,
    /// Index a single file as one document
    Index {
        /// File to ingest (.txt, .md, .html or .pdf)
        path: PathBuf,

        /// Document id (default: the file stem)
        #[arg(long)]
        id: Option<String>,

        /// Document title (default: the document id)
        #[arg(long)]
        title: Option<String>,

        /// Source type (plain_text, web_page, pdf); inferred from the extension when omitted
        #[arg(long)]
        source_type: Option<SourceType>,

        /// Re-index even if the content is unchanged
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Search the indexed chunks
    Search {
        /// The question to search for
        query: String,

        /// Number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Minimum cosine similarity
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Print corpus statistics
    Stats,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => Config::new()?,
    };
    Ok(config)
}

fn infer_source_type(path: &Path) -> SourceType {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => SourceType::StructuredBinaryExtract,
        Some("html") | Some("htm") => SourceType::WebPage,
        _ => SourceType::PlainText,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let client = RagClient::with_config(config).await?;
            RagMcpServer::with_client(Arc::new(client))?
                .run_stdio()
                .await?;
        }
        Command::Index {
            path,
            id,
            title,
            source_type,
            force,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let document_id = match id {
                Some(id) => id,
                None => path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("Cannot derive a document id from {}", path.display()))?,
            };
            let source_type = source_type.unwrap_or_else(|| infer_source_type(&path));

            let client = RagClient::with_config(config).await?;
            let response = client
                .index_document_bytes(&document_id, title, bytes, source_type, force)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Search {
            query,
            limit,
            threshold,
        } => {
            let client = RagClient::with_config(config).await?;
            let response = client
                .search(SearchRequest {
                    query,
                    limit,
                    threshold,
                })
                .await?;
            for hit in &response.results {
                println!(
                    "{:.4}  {}  [{}]  {}",
                    hit.score,
                    hit.chunk_id,
                    hit.metadata.kind,
                    hit.content.replace('\n', " ")
                );
            }
            if response.results.is_empty() {
                println!("No matching chunks");
            }
        }
        Command::Stats => {
            let client = RagClient::with_config(config).await?;
            let stats = client.get_statistics().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
