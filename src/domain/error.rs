// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed failures that callers may want to tell apart. Upstream
// I/O failures (images, headers, signal files) are NOT listed
// here; they propagate unchanged as anyhow errors carrying the
// offending path as context.
//
// Callers distinguish these with:
//   err.downcast_ref::<ChallengeError>()

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChallengeError {
    /// The data folder holds no records at all.
    #[error("No data was provided in '{}'", .folder.display())]
    NoData {
        folder: PathBuf,
    },

    /// Records exist but none of them carries a diagnosis label.
    #[error("There are no labels for the data in '{}'", .folder.display())]
    NoLabels {
        folder: PathBuf,
    },

    /// A reference signal does not match the network's fixed output shape.
    #[error("Record '{record}' has a (leads, samples) shape of {actual:?}, expected {expected:?}")]
    LabelShape {
        record:   String,
        expected: (usize, usize),
        actual:   (usize, usize),
    },

    /// A header file could not be understood.
    #[error("Malformed header '{}': {reason}", .path.display())]
    Header {
        path:   PathBuf,
        reason: String,
    },

    /// The signal file uses a storage format this crate cannot decode.
    #[error("Unsupported signal format '{format}' in '{}'", .path.display())]
    UnsupportedFormat {
        path:   PathBuf,
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_folder() {
        let err = ChallengeError::NoData { folder: PathBuf::from("data/train") };
        assert_eq!(err.to_string(), "No data was provided in 'data/train'");

        let err = ChallengeError::NoLabels { folder: PathBuf::from("x") };
        assert!(err.to_string().contains("no labels"));
    }

    #[test]
    fn test_survives_anyhow_round_trip() {
        let err: anyhow::Error = ChallengeError::NoData { folder: PathBuf::new() }.into();
        assert!(matches!(
            err.downcast_ref::<ChallengeError>(),
            Some(ChallengeError::NoData { .. })
        ));
    }
}
