use clap::{Parser, Subcommand};
use content_rag::Result;
use content_rag::commands::{import_content, reindex, search, show_stats, tune};
use content_rag::config::{resolve_base_dir, run_interactive_config, show_config};
use content_rag::content::{ContentType, Domain};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "content-rag")]
#[command(about = "Semantic search over brochure site content for the chatbot")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and content.db (default: ~/.content-rag)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and search defaults
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Load a JSON content export into the content tables
    Import {
        /// JSON file with projects, faq, lexique, certifications, services and company_info
        file: PathBuf,
    },
    /// Rebuild the embeddings from the site content
    Reindex {
        /// Only reindex this domain, e.g. "faq" or "projects"
        #[arg(long)]
        domain: Option<Domain>,
        /// Stop at the first item that cannot be embedded
        #[arg(long)]
        strict: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search indexed content
    Search {
        query: String,
        /// Minimum cosine similarity, between -1.0 and 1.0
        #[arg(long)]
        threshold: Option<f32>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Only search this content type, e.g. "faq"
        #[arg(long)]
        content_type: Option<ContentType>,
    },
    /// Show embedding counts per content type
    Stats,
    /// Run sample queries across several thresholds
    Tune {
        /// Query to try; repeat for several (default: built-in samples)
        #[arg(long = "query")]
        queries: Vec<String>,
        /// Threshold to try; repeat for several (default: 0.7, 0.5, 0.3, 0.1)
        #[arg(long = "threshold")]
        thresholds: Vec<f32>,
        /// Maximum results per query
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.base_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Import { file } => {
            import_content(&base_dir, &file).await?;
        }
        Commands::Reindex {
            domain,
            strict,
            json,
        } => {
            if !reindex(&base_dir, domain, strict, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Search {
            query,
            threshold,
            limit,
            content_type,
        } => {
            search(&base_dir, &query, threshold, limit, content_type).await?;
        }
        Commands::Stats => {
            show_stats(&base_dir).await?;
        }
        Commands::Tune {
            queries,
            thresholds,
            limit,
        } => {
            tune(&base_dir, queries, thresholds, limit).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
