// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `run`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::{DigitizerKind, DxKind, Task, TrainConfig};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the digitization and/or dx models on a challenge folder
    Train(TrainArgs),

    /// Run the trained models on every record of a folder
    Run(RunArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskArg {
    Digitization,
    Dx,
    Both,
}

impl From<TaskArg> for Task {
    fn from(t: TaskArg) -> Self {
        match t {
            TaskArg::Digitization => Task::Digitization,
            TaskArg::Dx           => Task::Dx,
            TaskArg::Both         => Task::Both,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitizerArg {
    /// Attention stack + MLP regressor
    Network,
    /// Mean of the training feature values
    SeedMean,
}

impl From<DigitizerArg> for DigitizerKind {
    fn from(d: DigitizerArg) -> Self {
        match d {
            DigitizerArg::Network  => DigitizerKind::Network,
            DigitizerArg::SeedMean => DigitizerKind::SeedMean,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxArg {
    /// Feed-forward softmax network
    Network,
    /// One-vs-rest random forests
    RandomForest,
}

impl From<DxArg> for DxKind {
    fn from(d: DxArg) -> Self {
        match d {
            DxArg::Network      => DxKind::Network,
            DxArg::RandomForest => DxKind::RandomForest,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Folder holding the training records (*.hea, signals, images)
    #[arg(long, short = 'd')]
    pub data_folder: PathBuf,

    /// Folder the model artifacts and metrics CSVs are written to
    #[arg(long, short = 'm')]
    pub model_folder: PathBuf,

    /// Which model(s) to train
    #[arg(long, value_enum, default_value_t = TaskArg::Both)]
    pub task: TaskArg,

    /// Which digitization model to produce
    #[arg(long, value_enum, default_value_t = DigitizerArg::Network)]
    pub digitizer: DigitizerArg,

    /// Which dx model to produce
    #[arg(long, value_enum, default_value_t = DxArg::Network)]
    pub dx_model: DxArg,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    /// Number of records processed together in one step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate of the digitization network
    #[arg(long, default_value_t = 1e-4)]
    pub digitization_lr: f64,

    /// Adam learning rate of the dx network
    #[arg(long, default_value_t = 1e-3)]
    pub dx_lr: f64,

    /// Narrate progress at info level
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<&TrainArgs> for TrainConfig {
    fn from(a: &TrainArgs) -> Self {
        let mut cfg = TrainConfig::default();
        cfg.digitizer_kind = a.digitizer.into();
        cfg.dx_kind        = a.dx_model.into();

        for fit in [&mut cfg.digitization_fit, &mut cfg.dx_fit] {
            fit.epochs     = a.epochs;
            fit.batch_size = a.batch_size;
        }
        cfg.digitization_fit.learning_rate = a.digitization_lr;
        cfg.dx_fit.learning_rate           = a.dx_lr;
        cfg
    }
}

/// All arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Folder holding the records to run on
    #[arg(long, short = 'd')]
    pub data_folder: PathBuf,

    /// Folder the trained artifacts were written to
    #[arg(long, short = 'm')]
    pub model_folder: PathBuf,

    /// Folder the output records are written to
    #[arg(long, short = 'o')]
    pub output_folder: PathBuf,

    /// Log and skip records that fail instead of aborting
    #[arg(long, short = 'f')]
    pub allow_failures: bool,

    /// Narrate progress at info level
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
