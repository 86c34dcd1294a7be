// ============================================================
// Layer 3 — Feature Vector
// ============================================================
// Every record is summarised by exactly two numbers:
//
//   [ Σ mean(image_i), Σ std(image_i) ]
//
// summed (not averaged) over all images of the record. A record
// with three images therefore has features roughly three times
// larger than the same scan stored once. Both models are trained
// on this convention, so it must not change.

use serde::{Deserialize, Serialize};

use crate::domain::record::RecordImage;

/// Number of scalars in a feature vector.
pub const FEATURE_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_WIDTH]);

impl FeatureVector {
    pub fn new(mean_sum: f64, std_sum: f64) -> Self {
        Self([mean_sum, std_sum])
    }

    /// Sum per-image pixel mean and population standard deviation.
    /// An empty image set gives `[0.0, 0.0]`; an image without pixels
    /// contributes nothing.
    pub fn from_images(images: &[RecordImage]) -> Self {
        let (mean_sum, std_sum) = images
            .iter()
            .map(|img| pixel_stats(&img.pixels))
            .fold((0.0, 0.0), |(m, s), (mi, si)| (m + mi, s + si));
        Self::new(mean_sum, std_sum)
    }

    /// Mean of the two entries; the digitizer derives its seed from it.
    pub fn mean(&self) -> f64 {
        (self.0[0] + self.0[1]) / FEATURE_WIDTH as f64
    }

    pub fn as_array(&self) -> [f64; FEATURE_WIDTH] {
        self.0
    }

    pub fn to_f32(&self) -> [f32; FEATURE_WIDTH] {
        [self.0[0] as f32, self.0[1] as f32]
    }
}

/// (mean, population std) of a pixel buffer.
fn pixel_stats(pixels: &[f64]) -> (f64, f64) {
    if pixels.is_empty() {
        return (0.0, 0.0);
    }
    let n = pixels.len() as f64;
    let mean = pixels.iter().sum::<f64>() / n;
    let variance = pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
