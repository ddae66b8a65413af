//! docpipe - Run document operations from the command line.
//!
//! Thin front end over the `docpipe` library: argument parsing, glob
//! expansion, result printing and the optional history file.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use docpipe::config::{Config, from_minutes};
use docpipe::storage::UploadedFile;
use docpipe::{
    AnyOperation, DocError, OperationResult, ProcessingRecord, Processor, TemporaryStorage,
};
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, Invocation};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(&cli);

    // Run the command and exit with its status
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<DocError>().map_or(1, DocError::exit_code);
            process::exit(code);
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the flag-derived default.
fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "docpipe=debug"
    } else if cli.quiet {
        "docpipe=error"
    } else {
        "docpipe=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic. Returns the process exit code.
async fn run(cli: Cli) -> Result<i32> {
    let config = Config::try_from(&cli)?;

    match &cli.command {
        Commands::Stage { file, expires_in } => {
            let storage = TemporaryStorage::new(config.storage.clone())?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = UploadedFile::new(name, file);
            let lifetime = expires_in.map(from_minutes).transpose()?;

            let staged = storage.store_uploaded_file(&upload, lifetime).await?;
            println!("{}", staged.display());
            Ok(0)
        }
        Commands::Publish { file, name } => {
            let storage = TemporaryStorage::new(config.storage.clone())?;
            let relative = storage.store_pdf_in_public(file, name.as_deref()).await?;
            if cli.json {
                let value = serde_json::json!({
                    "path": relative,
                    "url": storage.public_url(&relative),
                });
                println!("{value}");
            } else {
                println!("{}", storage.public_url(&relative));
            }
            Ok(0)
        }
        Commands::Cleanup => {
            let storage = TemporaryStorage::new(config.storage.clone())?;
            let removed = storage.cleanup().await?;
            if cli.json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else if !cli.quiet {
                println!("Removed {removed} expired file(s)");
            }
            Ok(0)
        }
        command => {
            let files = expand_inputs(command.patterns())?;
            let invocation = command
                .invocation(&files)
                .context("command does not run a document operation")?;
            run_operation(&cli, &config, invocation).await
        }
    }
}

async fn run_operation(cli: &Cli, config: &Config, invocation: Invocation) -> Result<i32> {
    let operation = AnyOperation::new(invocation.kind, config);
    let mut processor = Processor::new(operation);
    processor
        .process(&invocation.input, &invocation.output, &invocation.options)
        .await;
    let result = processor.into_info();

    print_result(cli, &result)?;

    if let Some(history) = &cli.history {
        let record = ProcessingRecord::new(
            invocation.kind.as_str(),
            &invocation.input,
            &invocation.output,
            result.clone(),
        );
        if let Err(err) = append_history(history, &record).await {
            warn!(history = %history.display(), error = %err, "Could not write history");
        }
    }

    Ok(result.exit_code())
}

fn print_result(cli: &Cli, result: &OperationResult) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.success {
        if !cli.quiet {
            println!("✓ {}", result.message);
        }
        for warning in result.warnings() {
            eprintln!("  warning: {warning}");
        }
    } else {
        eprintln!("✗ {}", result.message);
        if cli.verbose
            && let Some(trace) = &result.trace
        {
            for line in trace.lines() {
                eprintln!("  {line}");
            }
        }
    }
    Ok(())
}

/// Expand glob patterns in order.
///
/// A pattern that matches nothing is passed through unchanged, so the
/// operation can report the missing file itself.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::new();

    for pattern in patterns {
        let before = resolved.len();
        let paths =
            glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        for entry in paths {
            resolved.push(entry.with_context(|| format!("Cannot read match of {pattern}"))?);
        }
        if resolved.len() == before {
            resolved.push(PathBuf::from(pattern));
        }
    }

    debug!(patterns = patterns.len(), files = resolved.len(), "Expanded inputs");
    Ok(resolved)
}

/// Append one JSON line to the history file.
async fn append_history(path: &Path, record: &ProcessingRecord) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Cannot open history file {}", path.display()))?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}
