// ============================================================
// Layer 2 — Run Use Case
// ============================================================
// Inference side of the challenge:
//
//   load_digitization_model / load_dx_model
//       → rebuild each model from its artifact
//
//   run_digitization_model / run_dx_model
//       → one record in, one signal / label list out
//
//   RunUseCase
//       → every record of a folder through both models, each
//         result written as an output WFDB record mirroring the
//         input layout:
//
//           data/sub/00001_lr  →  outputs/sub/00001_lr.{hea,dat}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::narrate;
use crate::data::loader::WfdbSource;
use crate::domain::{
    error::ChallengeError,
    record::DigitizedSignal,
    traits::{Persistable, RecordSource},
};
use crate::ml::inferencer::{DigitizationModel, DxModel};

// ─── Entry points ─────────────────────────────────────────────────────────────

/// Load the digitization artifact from `model_folder`.
pub fn load_digitization_model(model_folder: &Path, verbose: bool) -> Result<DigitizationModel> {
    narrate!(verbose, "Loading the digitization model from '{}'...", model_folder.display());
    let model = DigitizationModel::load(model_folder)?;
    narrate!(verbose, "Loaded the {} digitization model.", model.kind_name());
    Ok(model)
}

/// Load the dx artifact from `model_folder`.
pub fn load_dx_model(model_folder: &Path, verbose: bool) -> Result<DxModel> {
    narrate!(verbose, "Loading the dx model from '{}'...", model_folder.display());
    let model = DxModel::load(model_folder)?;
    narrate!(
        verbose,
        "Loaded the {} dx model with {} classes.",
        model.predictor.kind_name(),
        model.classes.len()
    );
    Ok(model)
}

/// Digitize `record` (a path without extension). The signal has the
/// header's (num_samples, num_signals) shape.
pub fn run_digitization_model(
    model:   &DigitizationModel,
    record:  &Path,
    verbose: bool,
) -> Result<DigitizedSignal> {
    narrate!(verbose, "Digitizing '{}'...", record.display());
    model.run(&WfdbSource::new(), record)
}

/// Classify `record`. May return an empty list.
pub fn run_dx_model(
    model:   &DxModel,
    record:  &Path,
    signal:  Option<&DigitizedSignal>,
    verbose: bool,
) -> Result<Vec<String>> {
    narrate!(verbose, "Classifying '{}'...", record.display());
    let labels = model.run(&WfdbSource::new(), record, signal)?;
    narrate!(verbose, "Dx for '{}': {:?}", record.display(), labels);
    Ok(labels)
}

// ─── RunUseCase ───────────────────────────────────────────────────────────────

/// Outcome of a folder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed:    usize,
}

pub struct RunUseCase {
    digitization:   DigitizationModel,
    dx:             DxModel,
    output_folder:  PathBuf,
    allow_failures: bool,
}

impl RunUseCase {
    /// Load both artifacts from `model_folder`.
    pub fn new(
        model_folder:   &Path,
        output_folder:  impl Into<PathBuf>,
        allow_failures: bool,
        verbose:        bool,
    ) -> Result<Self> {
        Ok(Self {
            digitization:   load_digitization_model(model_folder, verbose)?,
            dx:             load_dx_model(model_folder, verbose)?,
            output_folder:  output_folder.into(),
            allow_failures,
        })
    }

    /// Run both models on every record of `data_folder` and write the
    /// results under the output folder.
    pub fn execute(
        &self,
        source:      &dyn RecordSource,
        data_folder: &Path,
        verbose:     bool,
    ) -> Result<RunSummary> {
        narrate!(verbose, "Finding the Challenge data...");
        let records = source.find_records(data_folder)?;
        if records.is_empty() {
            return Err(ChallengeError::NoData { folder: data_folder.to_path_buf() }.into());
        }

        narrate!(verbose, "Running the models on the Challenge data...");
        let width = records.len().to_string().len();
        let mut summary = RunSummary::default();

        for (i, relative) in records.iter().enumerate() {
            narrate!(
                verbose,
                "- {:>width$}/{}: {}...",
                i + 1,
                records.len(),
                relative.display(),
                width = width
            );

            match self.run_one(source, data_folder, relative) {
                Ok(()) => summary.succeeded += 1,
                Err(err) if self.allow_failures => {
                    tracing::warn!("... failed on '{}': {err:#}", relative.display());
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        narrate!(
            verbose,
            "Done. {} records written to '{}', {} failed.",
            summary.succeeded,
            self.output_folder.display(),
            summary.failed
        );
        Ok(summary)
    }

    fn run_one(&self, source: &dyn RecordSource, data_folder: &Path, relative: &Path) -> Result<()> {
        let record = data_folder.join(relative);
        let header = source.load_header(&record)?;
        let signal = self.digitization.run(source, &record)?;
        let dx     = self.dx.run(source, &record, Some(&signal))?;

        WfdbSource::new()
            .write_record(&self.output_folder.join(relative), &header, &signal, &dx)
            .with_context(|| format!("Cannot write outputs for '{}'", relative.display()))
    }
}
