use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_cli::{AppConfig, Settings, console, providers};
use docqa_telemetry::{TelemetryConfig, init_telemetry};
use tracing::info;

/// Answer questions using only the content of an ingested document
#[derive(Parser)]
#[command(name = "docqa", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the document, chunk it, embed the passages and replace the collection
    Ingest,
    /// Ask a single question and print the answer
    Ask {
        /// The question (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Start an interactive question loop
    Chat,
}

async fn ingest(config: &AppConfig) -> Result<()> {
    let path = config.document_path()?;
    let pipeline = providers::indexing_pipeline(config).await.map_err(user_error)?;

    println!("Carregando documento: {}", path.display());
    let document = pipeline.load(path).await.map_err(user_error)?;
    println!("{} página(s) carregada(s)", document.pages.len());

    let stored = pipeline.index_document(&document, &config.collection).await.map_err(user_error)?;
    println!("{stored} passagem(ns) armazenada(s) na collection '{}'", config.collection);
    Ok(())
}

async fn ask(config: &AppConfig, question: &str) -> Result<()> {
    let pipeline = providers::query_pipeline(config).await.map_err(user_error)?;
    let answer = pipeline.ask(question).await.map_err(user_error)?;

    println!("PERGUNTA: {question}");
    println!("RESPOSTA: {answer}");
    Ok(())
}

fn user_error(e: docqa_rag::RagError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig::default().with_format(cli.settings.log_format))
        .context("failed to initialize logging")?;

    let config = AppConfig::from_settings(&cli.settings)?;
    info!(provider = %config.provider.kind(), collection = %config.collection, "configuration loaded");

    match cli.command {
        Command::Ingest => ingest(&config).await,
        Command::Ask { question } => ask(&config, &question.join(" ")).await,
        Command::Chat => console::run(&config).await,
    }
}
