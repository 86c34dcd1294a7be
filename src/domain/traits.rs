// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training and inference workflows never touch the file
// system directly. They talk to:
//
//   RecordSource — anything that can enumerate records and hand
//                  back their header, images, reference signal,
//                  and diagnosis labels
//                  Implementations:
//                    - WfdbSource → a challenge folder on disk
//                    - in-memory fakes in the unit tests
//
//   Persistable  — anything that can write itself into a model
//                  folder and be read back from it
//                  Implementations:
//                    - DigitizationModel
//                    - DxModel

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::record::{Header, RecordImage, ReferenceSignal};

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Access to the records of a challenge dataset.
///
/// A record is addressed by a path without extension, e.g.
/// `data/00001_lr`; its header then lives at `data/00001_lr.hea`.
pub trait RecordSource {
    /// List the record identifiers under `data_folder`, relative to it,
    /// in a stable (sorted) order.
    fn find_records(&self, data_folder: &Path) -> Result<Vec<PathBuf>>;

    /// Read and parse the record's header.
    fn load_header(&self, record: &Path) -> Result<Header>;

    /// Load every image listed for the record.
    fn load_images(&self, record: &Path) -> Result<Vec<RecordImage>>;

    /// Read the ground-truth signal of the record.
    fn load_signal(&self, record: &Path) -> Result<ReferenceSignal>;

    /// Diagnosis labels of the record; empty when it has none.
    fn load_dx(&self, record: &Path) -> Result<Vec<String>> {
        Ok(self.load_header(record)?.dx)
    }
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved to and restored from a
/// model folder.
pub trait Persistable: Sized {
    /// Write this component's artifact into `model_folder`,
    /// creating the folder if needed.
    fn save(&self, model_folder: &Path) -> Result<()>;

    /// Read a previously saved artifact back from `model_folder`.
    fn load(model_folder: &Path) -> Result<Self>;
}
