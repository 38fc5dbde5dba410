//! DocQA CLI - Command-line interface
//!
//! Usage:
//!   docqa query <question>
//!   docqa documents

use anyhow::Context;
use clap::{Parser, Subcommand};
use docqa_core::AppConfig;
use docqa_parser::DirectoryReader;
use docqa_rag::{IndexProvider, QueryEngineProvider};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a directory of documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Document directory (overrides DATA_PATH)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and answer one question
    Query {
        /// Question to ask
        question: String,

        /// Also print the retrieved source chunks
        #[arg(long)]
        sources: bool,
    },
    /// List the documents that would be indexed
    Documents,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    }
    .with_env_override()?;

    if let Some(dir) = &cli.data_dir {
        config.data.path = dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Logs go to stderr so answers can be piped
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query { question, sources } => {
            let question = question.trim();
            if question.is_empty() {
                anyhow::bail!("Query string cannot be empty.");
            }

            let provider = IndexProvider::from_config(config);
            provider
                .initialize()
                .await
                .context("Failed to initialize index")?;

            let engine = provider.get_query_engine().await?;
            let result = engine.query(question).await?;
            println!("{}", result.response);

            if sources {
                for (i, node) in result.source_nodes.iter().enumerate() {
                    println!("\n[{}] {} (score {:.3})", i + 1, node.file_name, node.score);
                    println!("{}", node.content);
                }
            }
            provider.close().await;
        }
        Commands::Documents => {
            let files = DirectoryReader::new(&config.data.path)
                .required_exts(&config.data.required_exts)
                .recursive(config.data.recursive)
                .list_files()?;

            for file in &files {
                println!("{}", file.display());
            }
            eprintln!("{} documents in {}", files.len(), config.data.path.display());
        }
    }

    Ok(())
}
