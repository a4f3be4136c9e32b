use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;

use docqa_core::config::Config;
use docqa_core::types::RetrievedPassage;
use docqa_rag::{AnswerStatus, Persona, RagPipeline, SqlAnswerStatus};

/// Ask questions about a folder of PDFs, spreadsheets and office documents.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Index directory (overrides data.index_dir)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index from files and directories, replacing any previous one
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the ranked passages for a question
    Search {
        question: String,
        /// Number of passages (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Answer a question from the indexed documents with citations
    Ask {
        question: String,
        /// plant-operator, corporate-employee or general-employee
        #[arg(short, long)]
        persona: Option<Persona>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Answer a question about spreadsheets by generating and running SQL
    Sql {
        question: String,
        /// .xlsx workbooks or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        persona: Option<Persona>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = Config::load()?.settings()?;
    if let Some(dir) = &args.index_dir {
        settings.data.index_dir = dir.to_string_lossy().into_owned();
    }
    debug!(?settings, "loaded settings");
    let default_top_k = settings.retrieval.top_k;
    let pipeline = RagPipeline::from_settings(settings)?;

    match args.command {
        Commands::Ingest { paths } => {
            let report = pipeline.ingest(&paths).await?;
            for failure in &report.failures {
                println!("✗ {}: {}", failure.path.display(), failure.error);
            }
            println!(
                "Indexed {} chunks from {}/{} files into {}",
                report.chunks,
                report.files_ok,
                report.files_total,
                report.index_dir.display()
            );
        }
        Commands::Search { question, top_k, json } => {
            let passages = pipeline.search(&question, top_k.unwrap_or(default_top_k)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&passages)?);
            } else if passages.is_empty() {
                println!("No results.");
            } else {
                print_passages(&passages);
            }
        }
        Commands::Ask { question, persona, top_k, json } => {
            let persona = match persona {
                Some(p) => p,
                None => pipeline.default_persona()?,
            };
            let response = pipeline.ask(&question, persona, top_k.unwrap_or(default_top_k)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            println!("{}\n", response.answer.text);
            if response.answer.status == AnswerStatus::Generated && !response.answer.citations.is_empty() {
                println!("Sources: {}\n", response.answer.citations.join(", "));
            }
            if !response.passages.is_empty() {
                println!("Top context passages:");
                print_passages(&response.passages);
            }
        }
        Commands::Sql { question, paths, persona, json } => {
            let persona = match persona {
                Some(p) => p,
                None => pipeline.default_persona()?,
            };
            let answer = pipeline.ask_sql(&question, persona, &paths).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
                return Ok(());
            }
            if answer.status != SqlAnswerStatus::SqlFailed {
                if let Some(sql) = &answer.sql {
                    println!("SQL:\n{sql}\n");
                }
            }
            if let Some(result) = &answer.result {
                println!("{}\n", result.to_markdown(10));
            }
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!("\nSources: {}", answer.sources.join(", "));
            }
        }
    }
    pipeline.shutdown();
    Ok(())
}

fn print_passages(passages: &[RetrievedPassage]) {
    for (rank, p) in passages.iter().enumerate() {
        let preview: String = p.text.chars().take(700).collect();
        let ellipsis = if preview.len() < p.text.len() { "..." } else { "" };
        println!("{:>2}. {} (score={:.3})\n    {preview}{ellipsis}", rank + 1, p.source_label, p.score);
    }
}
