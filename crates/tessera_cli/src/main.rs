//! tessera - vault tag consolidation and 4D coordinate extraction.
//!
//! # Responsibility
//! - Thin command wrapper over `tessera_core` entry points.
//! - Build one explicit `BatchContext` per invocation; no ambient state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tessera_core::{BatchContext, EngineConfig, Orchestrator, RunMode};

/// Vault tag consolidation and Tesseract coordinate tooling.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Vault root directory
    #[arg(long)]
    vault: PathBuf,

    /// State directory for the coordinate store, backups and change logs
    #[arg(long, default_value = ".tessera")]
    state_dir: PathBuf,

    /// Engine configuration file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log directory; logging is skipped when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report the current tag landscape
    Audit,

    /// Apply the mapping table across the corpus
    Consolidate {
        /// Write changes instead of previewing them
        #[arg(long)]
        execute: bool,
    },

    /// Classify every document and persist coordinate records
    ExtractCoordinates,

    /// Take a corpus snapshot without running a batch
    Backup,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| tessera_core::default_log_level().to_string());
        if let Err(err) = tessera_core::init_logging(&level, &log_dir.to_string_lossy()) {
            eprintln!("logging setup failed: {err}");
            return ExitCode::FAILURE;
        }
    }

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("config error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::builtin_default(),
    };

    let orchestrator = Orchestrator::new(BatchContext {
        vault_root: cli.vault.clone(),
        state_dir: cli.state_dir.clone(),
        config,
    });

    match run(&cli.command, &orchestrator) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Commands, orchestrator: &Orchestrator) -> Result<(), String> {
    match command {
        Commands::Audit => {
            let audit = orchestrator.audit().map_err(|err| err.to_string())?;
            println!(
                "files={} unique_tags={} instances={} singletons={}",
                audit.files_scanned, audit.total_tags, audit.total_instances, audit.singleton_count
            );
            for (tag, count) in &audit.top_tags {
                println!("  {count:>5}  {tag}");
            }
            if !audit.case_variants.is_empty() {
                println!("case variants:");
                for (key, variants) in &audit.case_variants {
                    println!("  {key}: {}", variants.join(", "));
                }
            }
            report_failures(audit.failures.iter().map(|f| (&f.path, f.kind, &f.message)));
            Ok(())
        }
        Commands::Consolidate { execute } => {
            let mode = if *execute {
                RunMode::Execute
            } else {
                RunMode::DryRun
            };
            let result = orchestrator.consolidate(mode).map_err(|err| err.to_string())?;
            println!("{}", result.summary());
            for change in &result.changes {
                println!(
                    "  {}: [{}] -> [{}]",
                    change.path,
                    change.tags_before.join(", "),
                    change.tags_after.join(", ")
                );
            }
            if let Some(snapshot) = &result.snapshot {
                println!("backup: {}", snapshot.directory.display());
            }
            report_failures(result.failures.iter().map(|f| (&f.path, f.kind, &f.message)));
            Ok(())
        }
        Commands::ExtractCoordinates => {
            let report = orchestrator
                .extract_coordinates()
                .map_err(|err| err.to_string())?;
            println!(
                "classified={} unique_keys={} density={:.3} fallback_axes={}",
                report.files_classified,
                report.unique_coordinate_keys,
                report.coordinate_density,
                report.axis_fallbacks
            );
            for (axis, distribution) in &report.distributions {
                let rendered: Vec<String> = distribution
                    .iter()
                    .map(|(value, count)| format!("{value}={count}"))
                    .collect();
                println!("  {axis}: {}", rendered.join(" "));
            }
            report_failures(report.failures.iter().map(|f| (&f.path, f.kind, &f.message)));
            Ok(())
        }
        Commands::Backup => {
            let info = orchestrator.create_backup().map_err(|err| err.to_string())?;
            println!(
                "backup created: {} ({} files, {} bytes)",
                info.directory.display(),
                info.manifest.file_count,
                info.manifest.total_bytes
            );
            Ok(())
        }
    }
}

fn report_failures<'a, I>(failures: I)
where
    I: Iterator<Item = (&'a String, tessera_core::FailureKind, &'a String)>,
{
    for (path, kind, message) in failures {
        eprintln!("  [{}] {path}: {message}", kind.label());
    }
}
