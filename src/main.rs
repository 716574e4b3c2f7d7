use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_rag::commands::{index_document, inspect_store, run_query};
use pdf_rag::config::{Config, default_config_dir, show_config};

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Retrieval-augmented question answering over a single PDF document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a PDF into the vector store (run once per document)
    Index {
        /// Path to the PDF file to index
        pdf: PathBuf,
        /// Directory for the persisted vector store
        #[arg(long, default_value = "vector_db")]
        db: PathBuf,
    },
    /// Print every stored chunk's text (debug utility)
    Inspect {
        /// Directory of the persisted vector store
        #[arg(long, default_value = "vector_db")]
        db: PathBuf,
    },
    /// Ask questions against an indexed PDF
    Query {
        /// A single question; omit to start an interactive session
        question: Option<String>,
        /// Directory of the persisted vector store
        #[arg(long, default_value = "vector_db")]
        db: PathBuf,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> pdf_rag::Result<()> {
    let config = Config::load(default_config_dir()?)?;

    match cli.command {
        Commands::Index { pdf, db } => {
            index_document(&config, &pdf, &db).await?;
        }
        Commands::Inspect { db } => {
            inspect_store(&db).await?;
        }
        Commands::Query { question, db } => {
            run_query(&config, &db, question.as_deref()).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
