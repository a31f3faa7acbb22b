use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use simforge::agent::{AgentLoop, AgentState, FlagSignal};
use simforge::cli::{Cli, Commands};
use simforge::codegen::CodeGenerator;
use simforge::config::SimforgeConfig;
use simforge::dataset::Dataset;
use simforge::llm::{LlmClient, OpenAiClient, OpenAiConfig};
use simforge::metadata::ExperimentMetadata;
use simforge::prompt::PromptRenderer;
use simforge::sandbox::ProcessSandbox;
use simforge::store::ModelStore;
use simforge::sweep::run_batch;

fn setup_logging(config: &SimforgeConfig, verbose: bool) {
    let default = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SimforgeConfig::load(cli.config.as_ref())?;
    setup_logging(&config, cli.is_verbose());

    let store = ModelStore::open(&config.storage.db_path)?;
    let sandbox = Arc::new(ProcessSandbox::new(&config.sandbox));
    let renderer = PromptRenderer::new()?;

    match &cli.command {
        Commands::Generate { metadata } => {
            let metadata = load_metadata(metadata)?;
            let llm = open_llm(&config)?;
            let generator =
                CodeGenerator::new(llm, sandbox, renderer, config.codegen.clone());

            println!("{}", format!("Generating candidate for '{}'...", metadata.name).cyan());
            let handle = generator.generate_verified(&store, &metadata).await?;
            println!("{} {}", "Verified and stored:".green(), handle.bold());
        }

        Commands::Sweep { handle, grid } => {
            let grid = load_grid(grid)?;
            let timeout = Duration::from_millis(config.sandbox.timeout_ms);

            println!(
                "{}",
                format!("Running {} parameter sets against {handle}...", grid.len()).cyan()
            );
            let rows = run_batch(&store, sandbox.as_ref(), handle, &grid, timeout).await?;
            println!("{} {} rows stored", "Sweep complete:".green(), rows);
        }

        Commands::Ask { handle, question } => {
            let records = store.load_result_records(handle)?;
            if records.is_empty() {
                eyre::bail!("No results stored for '{handle}'; run `sweep` first");
            }
            let dataset = Dataset::from_records(&records);

            let llm = open_llm(&config)?;
            let agent = AgentLoop::new(llm, sandbox, renderer, config.agent.clone());

            // Ctrl-C stops the loop at the next turn boundary
            let cancel = FlagSignal::new();
            let cancel_handler = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel_handler.set();
                }
            });

            println!("{}", "Asking...".cyan());
            let result = agent.ask(&store, handle, &dataset, question, &cancel).await?;

            match result.state {
                AgentState::ModelReturnedAnswer => {
                    println!("{}", "Answer:".green().bold());
                    println!("{}", result.answer);
                }
                AgentState::Cancelled => {
                    println!("{}", "Cancelled before an answer was reached.".yellow());
                }
                AgentState::BudgetExhausted => {
                    println!("{}", "Step budget exhausted without an answer.".yellow());
                }
            }
            if !result.artifacts.is_empty() {
                println!("{}", "Artifacts:".bold());
                for artifact in &result.artifacts {
                    println!("  {}", config.sandbox.artifact_dir.join(artifact).display());
                }
            }
        }

        Commands::Reports { handle } => {
            let reports = store.list_reports(handle.as_deref())?;
            if reports.is_empty() {
                println!("{}", "No reports stored.".yellow());
            }
            for report in reports {
                println!(
                    "{} {} {}",
                    format!("[{}]", report.created_at).dimmed(),
                    report.model_id.bold(),
                    format!("({} artifacts)", report.artifacts.len()).dimmed()
                );
                println!("  Q: {}", report.question);
                println!("  A: {}", report.answer);
            }
        }
    }

    Ok(())
}

fn open_llm(config: &SimforgeConfig) -> Result<Arc<dyn LlmClient>> {
    let client = OpenAiClient::new(OpenAiConfig::from(&config.llm))
        .context("Failed to construct LLM client")?;
    Ok(Arc::new(client))
}

fn load_metadata(path: &Path) -> Result<ExperimentMetadata> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata file: {}", path.display()))?;
    // YAML is a JSON superset, so one parser covers both formats
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse metadata file: {}", path.display()))
}

fn load_grid(path: &Path) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read grid file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse grid file: {}", path.display()))
}
