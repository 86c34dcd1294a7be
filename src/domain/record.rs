// ============================================================
// Layer 3 — Record Domain Types
// ============================================================
// A record is one patient case. On disk it is a WFDB header
// (`.hea`) plus one or more scanned ECG images and, for
// training data, a binary signal file with the ground truth.
//
// By the time these structs are created every format detail
// has already been decoded by the data layer:
//
//   Header          — what the `.hea` file declares
//   RecordImage     — raw pixel values of one image
//   ReferenceSignal — ground-truth waveform, lead-major (L × S)
//   DigitizedSignal — model output, sample-major (S × L), i16

use serde::{Deserialize, Serialize};

/// One signal line of a WFDB header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub file_name:      String,
    pub format:         String,
    /// ADC units per physical unit
    pub gain:           f64,
    /// Digital value corresponding to 0 physical units
    pub baseline:       i32,
    pub units:          String,
    pub adc_resolution: u32,
    pub adc_zero:       i32,
    pub initial_value:  Option<i32>,
    pub checksum:       Option<i32>,
    pub block_size:     u32,
    /// Lead name, e.g. "II" or "aVR"
    pub description:    String,
}

/// Everything a record header declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub record_name:        String,
    pub num_signals:        usize,
    pub sampling_frequency: f64,
    pub num_samples:        usize,
    pub signals:            Vec<SignalSpec>,
    /// Image file names, relative to the record's directory
    pub image_files:        Vec<String>,
    /// Diagnosis labels; empty when the record is unlabelled
    pub dx:                 Vec<String>,
}

/// Raw pixel values of one image, channels interleaved, no scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordImage {
    pub width:    u32,
    pub height:   u32,
    pub channels: u8,
    pub pixels:   Vec<f64>,
}

impl RecordImage {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<f64>) -> Self {
        Self { width, height, channels, pixels }
    }

    /// A single-channel image where every pixel has the same value.
    pub fn constant(width: u32, height: u32, value: f64) -> Self {
        let pixels = vec![value; (width * height) as usize];
        Self::new(width, height, 1, pixels)
    }
}

// ─── ReferenceSignal ──────────────────────────────────────────────────────────
/// Ground-truth waveform stored lead-major: all samples of lead 0,
/// then all samples of lead 1, and so on.
///
/// Signal files are sample-major on disk and get transposed once, at
/// load time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSignal {
    num_leads:   usize,
    num_samples: usize,
    values:      Vec<f32>,
}

impl ReferenceSignal {
    /// Build from sample-major values (row = sample, column = lead).
    /// `values.len()` must equal `num_leads * num_samples`.
    pub fn from_sample_major(num_samples: usize, num_leads: usize, values: &[f32]) -> Self {
        assert_eq!(values.len(), num_leads * num_samples, "signal length mismatch");
        let mut lead_major = vec![0.0f32; values.len()];
        for s in 0..num_samples {
            for l in 0..num_leads {
                lead_major[l * num_samples + s] = values[s * num_leads + l];
            }
        }
        Self { num_leads, num_samples, values: lead_major }
    }

    /// `(num_leads, num_samples)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_leads, self.num_samples)
    }

    #[cfg(test)]
    pub fn lead(&self, index: usize) -> &[f32] {
        &self.values[index * self.num_samples..(index + 1) * self.num_samples]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

// ─── DigitizedSignal ──────────────────────────────────────────────────────────
/// Output of the digitization model: `num_samples` rows of
/// `num_signals` 16-bit values each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitizedSignal {
    num_samples: usize,
    num_signals: usize,
    values:      Vec<i16>,
}

impl DigitizedSignal {
    pub fn new(num_samples: usize, num_signals: usize, values: Vec<i16>) -> Self {
        assert_eq!(values.len(), num_samples * num_signals, "signal length mismatch");
        Self { num_samples, num_signals, values }
    }

    /// `(num_samples, num_signals)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_samples, self.num_signals)
    }

    pub fn get(&self, sample: usize, signal: usize) -> i16 {
        self.values[sample * self.num_signals + signal]
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }
}
