use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use javalift::{
    build_request, export_download, read_source_file, GenerationConfig, LlmClient, Pipeline,
    PipelineConfig, RunMode, RunOutcome, StageId,
};

#[derive(Parser)]
#[command(name = "javalift")]
#[command(author, version, about = "Legacy Java review, documentation and refactoring pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the review (and optionally validate + refactor) pipeline over a Java file
    Process {
        /// Legacy Java source file
        #[arg(short, long)]
        input: PathBuf,

        /// Stop after documentation or run the full refactor
        #[arg(short, long, value_enum, default_value_t = RunMode::Full)]
        mode: RunMode,

        /// Directory holding legacy_code/, docs/ and new_code/
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Write this run's outputs under runs/<run-id>/ instead of the shared paths
        #[arg(long)]
        isolate: bool,

        /// Remove a run lock left behind by an interrupted run
        #[arg(long)]
        force_unlock: bool,

        /// Directory to save RefactoredCode.java into (full mode)
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the prompts a stage would send, without calling the model
    Prompts {
        /// Stage input: Java source for review, Markdown for validate/refactor
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = StageId::Review)]
        stage: StageId,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            mode,
            workspace,
            isolate,
            force_unlock,
            export,
            report,
            verbose,
        } => {
            setup_logging(verbose);
            process(input, mode, workspace, isolate, force_unlock, export, report).await
        }
        Commands::Prompts {
            input,
            stage,
            verbose,
        } => {
            setup_logging(verbose);
            show_prompts(input, stage)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn process(
    input: PathBuf,
    mode: RunMode,
    workspace: PathBuf,
    isolate: bool,
    force_unlock: bool,
    export: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    // Credential problems stop here, before any stage runs
    let config = GenerationConfig::from_env().context("Language model configuration")?;
    info!("Using {} model {}", config.provider, config.model);
    let client = LlmClient::new(config);

    let source = read_source_file(&input).context("Failed to load input source")?;
    info!(
        "Loaded {:?}: {} lines",
        input,
        source.content.lines().count()
    );

    let pipeline = Pipeline::new(
        &client,
        PipelineConfig {
            mode,
            workspace,
            isolate,
            force_unlock,
        },
    );
    let outcome = pipeline.run(&source).await?;

    print_outcome(&outcome);

    if let Some(path) = &report_path {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, &outcome.report).context("Failed to write JSON")?;
        info!("Run report written to {:?}", path);
    }

    if let (Some(dir), Some(download)) = (&export, &outcome.report.download) {
        let path = export_download(download, dir)?;
        info!("Saved {} ({}) to {:?}", download.file_name, download.mime, path);
    } else if export.is_some() {
        warn!("Nothing to export: no refactored code was produced");
    }

    let report = outcome.into_result()?;
    info!("Run {} complete ({:?})", report.run_id, report.state);
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    for stage in &outcome.report.stages {
        if !outcome.report.mode.stages().contains(&stage.stage) {
            continue;
        }

        println!("## {} [{:?}]", stage.label, stage.status);
        if let Some(artifact) = outcome.artifact(stage.stage) {
            println!();
            println!("{}", artifact.content());
        }
        println!();
        println!("### Logs");
        println!("{}", stage.trace_text());
        println!();
    }
}

fn show_prompts(input: PathBuf, stage: StageId) -> Result<()> {
    let text = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read file: {:?}", input))?;
    let request = build_request(stage, &text);

    println!("=== System ({}) ===", stage);
    println!("{}", request.system);
    println!();
    println!("=== Task ===");
    println!("{}", request.user);
    Ok(())
}
