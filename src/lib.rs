#![recursion_limit = "256"]

//! ECG image digitization and dx classification.
//!
//! Layers, outermost first:
//!
//! - [`cli`]: command line parsing and dispatch
//! - [`application`]: the train / load / run workflows
//! - [`domain`]: records, features, traits and errors
//! - [`data`]: record I/O, extraction, datasets and batchers
//! - [`ml`]: burn networks, the fit loop and inference policies
//! - [`infra`]: artifact persistence and metrics
//!
//! The six challenge entry points are re-exported at the crate root.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

pub use application::run_use_case::{
    load_digitization_model, load_dx_model, run_digitization_model, run_dx_model,
};
pub use application::train_use_case::{train_digitization_model, train_dx_model};
pub use domain::error::ChallengeError;
pub use domain::record::DigitizedSignal;
pub use ml::inferencer::{DigitizationModel, DxModel, DxPredictor};
