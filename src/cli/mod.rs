// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the digitization and/or dx models
//   2. `run`   — loads both models and writes one output
//                record per input record
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, RunArgs, TrainArgs};

use crate::data::loader::WfdbSource;

/// The main CLI struct. clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "ecg-challenge",
    version,
    about = "Train ECG image digitization and dx classification models, then run them on records."
)]
pub struct Cli {
    /// The subcommand to run (train or run)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Run(args)   => run_models(args),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on records in '{}'", args.data_folder.display());

    let use_case = TrainUseCase::new((&args).into());
    use_case.execute(
        &WfdbSource::new(),
        args.task.into(),
        &args.data_folder,
        &args.model_folder,
        args.verbose,
    )?;

    println!("Training complete. Models saved to '{}'.", args.model_folder.display());
    Ok(())
}

/// Handles the `run` subcommand.
fn run_models(args: RunArgs) -> Result<()> {
    use crate::application::run_use_case::RunUseCase;

    let use_case = RunUseCase::new(
        &args.model_folder,
        &args.output_folder,
        args.allow_failures,
        args.verbose,
    )?;
    let summary = use_case.execute(&WfdbSource::new(), &args.data_folder, args.verbose)?;

    println!(
        "Done. {} records written to '{}' ({} failed).",
        summary.succeeded,
        args.output_folder.display(),
        summary.failed
    );
    Ok(())
}
