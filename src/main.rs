//! Incident Lens CLI

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use incident_lens::services::persistence::{write_json, TOOLS_RESULTS_FILE};
use incident_lens::services::{write_sample_files, ReplayScript};
use incident_lens::storage::load_or_default;
use incident_lens::{run_pipeline, run_tools_only, AnalysisConfig, EventSink, PipelineInputs};
use incident_lens_core::PipelineEvent;

#[derive(Parser, Debug)]
#[command(
    name = "incident-lens",
    about = "Root-cause analysis of production incidents from logs and code",
    version
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full Analyzer/Critic pipeline
    Analyze {
        /// Log file to analyze
        log: PathBuf,
        /// Source files related to the incident
        code: Vec<PathBuf>,
        /// Recorded responses for both roles
        #[arg(long)]
        replay: PathBuf,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory (overrides output.dir)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Do not print progress events
        #[arg(short, long)]
        quiet: bool,
    },
    /// Write a sample log, code files, replay file and starter config
    Init {
        /// Directory to write into
        #[arg(default_value = "samples")]
        dir: PathBuf,
    },
    /// Run parsing, chunking, redaction and grep without any provider
    Tools {
        log: PathBuf,
        code: Vec<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze {
            log,
            code,
            replay,
            config,
            output,
            quiet,
        } => analyze(log, code, &replay, config.as_deref(), output, quiet).await,
        Command::Init { dir } => init(&dir),
        Command::Tools {
            log,
            code,
            config,
            output,
        } => tools(log, code, config.as_deref(), output).await,
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_config(path: Option<&Path>, output: Option<PathBuf>) -> anyhow::Result<AnalysisConfig> {
    let mut config = load_or_default(path).context("failed to load configuration")?;
    if let Some(dir) = output {
        config.output.dir = dir.display().to_string();
    }
    Ok(config)
}

async fn analyze(
    log: PathBuf,
    code: Vec<PathBuf>,
    replay: &Path,
    config: Option<&Path>,
    output: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = load_config(config, output)?;
    let inputs = PipelineInputs::new(log, code);
    inputs.check_exists()?;

    let (analyzer, critic) = ReplayScript::load(replay)
        .context("failed to load replay file")?
        .into_providers();

    let result = if quiet {
        run_pipeline(&inputs, &config, analyzer, critic, &EventSink::none()).await
    } else {
        let (events, mut rx) = EventSink::channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        });
        let result = run_pipeline(&inputs, &config, analyzer, critic, &events).await;
        drop(events);
        let _ = printer.await;
        result
    };

    let outcome = result.context("analysis pipeline failed")?;
    println!();
    println!("{}", outcome.report.title);
    println!("Root cause: {}", outcome.report.root_cause);
    println!("Fix: {}", outcome.report.fix);
    println!(
        "Confidence: {:.2} ({})",
        outcome.report.confidence, outcome.report.verdict
    );
    if let Some(warning) = &outcome.metrics.warning {
        println!("Warning: {}", warning);
    }
    println!("Report: {}", outcome.artifacts.report.display());
    Ok(())
}

fn init(dir: &Path) -> anyhow::Result<()> {
    let files = write_sample_files(dir).context("failed to write sample files")?;
    println!("Sample files written to {}", dir.display());
    let code: Vec<String> = files.code.iter().map(|p| p.display().to_string()).collect();
    println!(
        "Run: incident-lens analyze {} {} --replay {} --config {}",
        files.log.display(),
        code.join(" "),
        files.replay.display(),
        files.config.display()
    );
    Ok(())
}

async fn tools(
    log: PathBuf,
    code: Vec<PathBuf>,
    config: Option<&Path>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config, output)?;
    let inputs = PipelineInputs::new(log, code);

    let report = run_tools_only(&inputs, &config)
        .await
        .context("tools-only run failed")?;

    let path = Path::new(&config.output.dir).join(TOOLS_RESULTS_FILE);
    write_json(&path, &report)?;

    println!(
        "Parsed {} entries ({} errors), selected {}",
        report.parsed_logs.summary.total_lines,
        report.parsed_logs.summary.error_count,
        report.chunked_logs.chunked_count
    );
    if let Some(grep) = &report.grep_test {
        println!(
            "grep_error: {} matches in {} files",
            grep.total_matches, grep.files_searched
        );
    }
    println!("Results: {}", path.display());
    Ok(())
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::ToolResult { tool, success, .. } => {
            let status = if *success { "ok" } else { "failed" };
            println!("[tool] {} {}", tool, status);
        }
        PipelineEvent::LogChunkSelected {
            selected_count,
            source,
            ..
        } => println!("[chunk] {} entries from {}", selected_count, source),
        PipelineEvent::AgentMessage { agent, .. } => println!("[agent] {} responded", agent),
        PipelineEvent::RoundComplete {
            round,
            verdict,
            open_issues,
            converged,
        } => println!(
            "[round {}] verdict={} open_issues={} converged={}",
            round, verdict, open_issues, converged
        ),
        PipelineEvent::PipelineComplete {
            total_rounds,
            total_tokens,
            estimated_cost,
            ..
        } => println!(
            "[done] rounds={} tokens={} cost={:.4}",
            total_rounds, total_tokens, estimated_cost
        ),
    }
}
