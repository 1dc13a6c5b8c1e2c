#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use command::{
    CommandStrategy, IngestInput, IngestStrategy, InitStrategy, SearchInput, SearchStrategy,
    VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vmindex_config::StoreBackend;

#[derive(Parser)]
#[command(name = "vmindex")]
#[command(about = "Index voicemail transcripts for semantic search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Extract, embed and index a batch of records
    Ingest {
        /// JSON array of records; the built-in sample set when omitted
        file: Option<PathBuf>,

        /// Target collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Records processed at once
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Store backend (chroma|memory)
        #[arg(long)]
        store: Option<StoreBackend>,

        /// Run a search after ingesting
        #[arg(short, long)]
        query: Option<String>,

        /// Results for --query
        #[arg(short = 'k', long, default_value_t = 2)]
        top_k: usize,

        /// Exit with an error if any record was skipped
        #[arg(long)]
        strict: bool,
    },
    /// Search an indexed collection
    Search {
        /// Free-text query
        query: String,

        /// Maximum results
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,

        /// Store backend; only chroma persists between runs
        #[arg(long)]
        store: Option<StoreBackend>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Ingest {
            file,
            collection,
            concurrency,
            store,
            query,
            top_k,
            strict,
        } => {
            IngestStrategy
                .execute(IngestInput {
                    file,
                    collection,
                    concurrency,
                    store,
                    query,
                    top_k,
                    strict,
                })
                .await
        }
        Commands::Search {
            query,
            top_k,
            collection,
            store,
        } => {
            SearchStrategy
                .execute(SearchInput {
                    query,
                    top_k,
                    collection,
                    store,
                })
                .await
        }
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
