//! planforge - Main CLI Entry Point

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use planforge::config::Config;
use planforge::ingest::FsDocumentSource;
use planforge::llm::{ChatOptions, OllamaChatClient};
use planforge::pipeline::{PipelineConfig, ProcessingPipeline};
use planforge::store::{DocumentStore, MemoryDocumentStore};
use planforge::telemetry::TelemetryCollector;
use planforge::types::{DocumentStatus, RequirementKind, StageStatus};

#[derive(Parser)]
#[command(name = "planforge", version, about = "Turn product documents into validated requirements and test cases")]
struct Args {
    /// Ollama host
    #[arg(long)]
    host: Option<String>,

    /// Ollama port
    #[arg(long)]
    port: Option<u16>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Verbose iteration logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a document into requirements and test cases
    Process {
        /// Path to the document (PDF or plain text)
        file: PathBuf,
    },

    /// Check that the model server is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    let base_url = match (&args.host, args.port) {
        (None, None) => config.model.base_url.clone(),
        (host, port) => format!(
            "http://{}:{}",
            host.as_deref().unwrap_or("127.0.0.1"),
            port.unwrap_or(11434)
        ),
    };
    let model = args.model.clone().unwrap_or_else(|| config.model.name.clone());

    let client = OllamaChatClient::with_config(&base_url, &model)?;

    match &args.command {
        Commands::Check => check(&client).await,
        Commands::Process { file } => process(args.verbose, &config, client, file).await,
    }
}

async fn check(client: &OllamaChatClient) -> Result<()> {
    if !client.health_check().await? {
        bail!(
            "{} Ollama is not reachable at {}. Start with: ollama serve",
            "✗".red(),
            client.base_url()
        );
    }

    println!("{} Ollama is running at {}", "✓".green(), client.base_url());

    let models = client.list_models().await?;
    if models.is_empty() {
        println!("  No models installed. Pull one with: ollama pull {}", client.model());
    } else {
        println!("  Installed models:");
        for name in models {
            let marker = if name == client.model() { "*" } else { " " };
            println!("  {} {}", marker, name);
        }
    }

    Ok(())
}

async fn process(
    verbose: bool,
    config: &Config,
    client: OllamaChatClient,
    file: &PathBuf,
) -> Result<()> {
    if !client.health_check().await? {
        bail!(
            "{} Ollama is not reachable at {}. Start with: ollama serve",
            "✗".red(),
            client.base_url()
        );
    }

    let bytes = std::fs::read(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string());

    let store = Arc::new(MemoryDocumentStore::new());
    let source = Arc::new(FsDocumentSource::new(config.documents_dir()?)?);
    let collector = Arc::new(TelemetryCollector::new());
    let model_label = client.model().to_string();

    let document = store.create_document(&file_name);
    source.store(&document.id, &bytes)?;

    let pipeline = Arc::new(ProcessingPipeline::new(
        store.clone(),
        source.clone(),
        Arc::new(client),
        collector.clone(),
        PipelineConfig {
            chat: ChatOptions {
                temperature: config.model.temperature,
                max_tokens: config.model.max_tokens,
                tools: Vec::new(),
            },
            verbose,
            ..PipelineConfig::default()
        },
    ));

    println!("Processing {} with {}\n", file_name.bold(), model_label);
    pipeline.start_processing(&document.id).await?;

    let bar = ProgressBar::new(6);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let final_status = loop {
        let report = pipeline.get_status(&document.id).await?;

        let completed = report
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Completed)
            .count();
        bar.set_position(completed as u64);
        bar.set_message(report.stages[report.current_stage_index].name.clone());

        match report.status {
            DocumentStatus::Completed | DocumentStatus::Error => break report.status,
            _ => tokio::time::sleep(Duration::from_millis(300)).await,
        }
    };
    bar.finish_and_clear();

    source.delete(&document.id);

    if final_status == DocumentStatus::Error {
        bail!("{} Processing failed; see errors above", "✗".red());
    }

    print_report(store.as_ref(), &document.id).await?;

    let stats = collector.stats();
    println!(
        "\n{} {} model iterations, {} rejected by validation",
        "Σ".dimmed(),
        stats.iterations,
        stats.failed_iterations
    );

    Ok(())
}

async fn print_report(store: &MemoryDocumentStore, document_id: &str) -> Result<()> {
    let document = store
        .get_document(document_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("document vanished before reporting"))?;

    let requirements = document.requirements.unwrap_or_default();

    println!("{}", "Requirements".bold().underline());
    for requirement in &requirements {
        let kind = match requirement.kind {
            RequirementKind::Functional => "functional".green(),
            RequirementKind::NonFunctional => "non-functional".yellow(),
        };
        println!(
            "\n  {} [{}] {}",
            requirement.id.bold(),
            kind,
            requirement.description
        );

        for tc in &requirement.test_cases {
            let polarity = if tc.is_negative {
                "-".red().to_string()
            } else {
                "+".green().to_string()
            };
            let types = if tc.test_types.is_empty() {
                String::new()
            } else {
                format!(" ({})", tc.test_types.join(", "))
            };
            println!("    {} {}{}", polarity, tc.description, types.dimmed());
        }
    }

    let total_cases: usize = requirements.iter().map(|r| r.test_cases.len()).sum();
    println!(
        "\n{} requirements, {} test cases",
        requirements.len(),
        total_cases
    );

    Ok(())
}
