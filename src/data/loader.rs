// ============================================================
// Layer 4 — WFDB Record Loader
// ============================================================
// Reads records from a challenge data folder:
//
//   data/
//     00001_lr.hea       ← header (signal layout, #Image, #Dx)
//     00001_lr.dat       ← ground truth, WFDB format 16
//     00001_lr-0.png     ← scanned ECG image(s)
//     sub/00002_lr.hea   ← folders may nest
//
// A record is addressed by its path without extension. Image
// file names in the header are relative to the record's own
// directory.
//
// Format 16 is little-endian i16, samples interleaved across
// all signals stored in the same file:
//   [s0_l0, s0_l1, ..., s0_lN, s1_l0, ...]
// Physical value = (digital - baseline) / gain; the digital
// value -32768 marks a missing sample (→ NaN).
//
// Every failure here is an upstream I/O failure: it is returned
// with the offending path as context and never retried.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::data::header::{parse_header, render_header};
use crate::domain::error::ChallengeError;
use crate::domain::record::{DigitizedSignal, Header, RecordImage, ReferenceSignal, SignalSpec};
use crate::domain::traits::RecordSource;

const HEADER_EXTENSION: &str = "hea";
const MISSING_SAMPLE: i16 = i16::MIN;
const OUTPUT_GAIN: f64 = 1000.0;

/// Reads records laid out the way the challenge distributes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct WfdbSource;

impl WfdbSource {
    pub fn new() -> Self {
        Self
    }

    /// Write a digitized signal and its dx labels as a WFDB record
    /// (`<record>.hea` + `<record>.dat`), creating parent folders.
    ///
    /// Values are stored as format-16 digital samples with a gain of
    /// 1000 per mV and a zero baseline. Lead names and the sampling
    /// frequency are taken from `template` when it has them.
    pub fn write_record(
        &self,
        record:   &Path,
        template: &Header,
        signal:   &DigitizedSignal,
        dx:       &[String],
    ) -> Result<()> {
        if let Some(parent) = record.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create output folder '{}'", parent.display()))?;
        }

        let stem = record
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| template.record_name.clone());
        let dat_name = format!("{stem}.dat");
        let (num_samples, num_signals) = signal.shape();

        let signals = (0..num_signals)
            .map(|lead| {
                let checksum = (0..num_samples)
                    .fold(0i16, |acc, s| acc.wrapping_add(signal.get(s, lead)));
                SignalSpec {
                    file_name:      dat_name.clone(),
                    format:         "16".to_string(),
                    gain:           OUTPUT_GAIN,
                    baseline:       0,
                    units:          "mV".to_string(),
                    adc_resolution: 16,
                    adc_zero:       0,
                    initial_value:  Some(if num_samples > 0 { signal.get(0, lead) as i32 } else { 0 }),
                    checksum:       Some(checksum as i32),
                    block_size:     0,
                    description:    template
                        .signals
                        .get(lead)
                        .map(|s| s.description.clone())
                        .unwrap_or_else(|| format!("lead{lead}")),
                }
            })
            .collect();

        let header = Header {
            record_name:        stem,
            num_signals,
            sampling_frequency: template.sampling_frequency,
            num_samples,
            signals,
            image_files:        Vec::new(),
            dx:                 dx.to_vec(),
        };

        let hea_path = header_path(record);
        fs::write(&hea_path, render_header(&header))
            .with_context(|| format!("Cannot write header '{}'", hea_path.display()))?;

        let bytes: Vec<u8> = signal.values().iter().flat_map(|v| v.to_le_bytes()).collect();
        let dat_path = record.with_file_name(&dat_name);
        fs::write(&dat_path, bytes)
            .with_context(|| format!("Cannot write signal '{}'", dat_path.display()))?;

        tracing::debug!("Wrote output record '{}'", record.display());
        Ok(())
    }
}

impl RecordSource for WfdbSource {
    fn find_records(&self, data_folder: &Path) -> Result<Vec<PathBuf>> {
        // A missing folder simply has no records; the caller decides
        // whether that is fatal.
        if !data_folder.exists() {
            tracing::warn!(
                "Data folder '{}' does not exist; no records found",
                data_folder.display()
            );
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        collect_headers(data_folder, data_folder, &mut records)?;
        records.sort();

        tracing::debug!("Found {} records in '{}'", records.len(), data_folder.display());
        Ok(records)
    }

    fn load_header(&self, record: &Path) -> Result<Header> {
        let path = header_path(record);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read header '{}'", path.display()))?;
        Ok(parse_header(&text, &path)?)
    }

    fn load_images(&self, record: &Path) -> Result<Vec<RecordImage>> {
        let header = self.load_header(record)?;
        let dir = record.parent().unwrap_or_else(|| Path::new(""));

        header
            .image_files
            .iter()
            .map(|name| {
                let path = dir.join(name);
                let img = image::open(&path)
                    .with_context(|| format!("Cannot load image '{}'", path.display()))?;
                Ok(to_record_image(&img))
            })
            .collect()
    }

    fn load_signal(&self, record: &Path) -> Result<ReferenceSignal> {
        let header = self.load_header(record)?;
        let dir = record.parent().unwrap_or_else(|| Path::new(""));
        let num_signals = header.num_signals;

        // Signals sharing a file are interleaved in header order
        let mut files: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, spec) in header.signals.iter().enumerate() {
            match files.iter_mut().find(|(name, _)| *name == spec.file_name) {
                Some((_, leads)) => leads.push(i),
                None => files.push((spec.file_name.as_str(), vec![i])),
            }
        }

        let mut decoded: Vec<(&[usize], Vec<i16>)> = Vec::with_capacity(files.len());
        for (file_name, leads) in &files {
            let path = dir.join(file_name);
            for &lead in leads {
                let format = &header.signals[lead].format;
                if format != "16" {
                    return Err(ChallengeError::UnsupportedFormat {
                        path:   path.clone(),
                        format: format.clone(),
                    }
                    .into());
                }
            }

            let bytes = fs::read(&path)
                .with_context(|| format!("Cannot read signal '{}'", path.display()))?;
            decoded.push((leads.as_slice(), decode_format16(&bytes)));
        }

        // The shortest file bounds the record; the header may cap it further
        let frames = decoded
            .iter()
            .map(|(leads, digital)| digital.len() / leads.len())
            .min()
            .unwrap_or(0);
        let num_samples = if header.num_samples > 0 { header.num_samples.min(frames) } else { frames };

        // Re-interleave every file into one sample-major frame buffer
        let mut frames_buf = vec![0.0f32; num_samples * num_signals];
        for (leads, digital) in &decoded {
            for s in 0..num_samples {
                for (offset, &lead) in leads.iter().enumerate() {
                    frames_buf[s * num_signals + lead] =
                        to_physical(digital[s * leads.len() + offset], &header.signals[lead]);
                }
            }
        }

        Ok(ReferenceSignal::from_sample_major(num_samples, num_signals, &frames_buf))
    }
}

/// Recursively collect `*.hea` files below `dir`, relative to `root`
/// and without extension.
fn collect_headers(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_headers(root, &path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(HEADER_EXTENSION) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.with_extension(""));
        }
    }
    Ok(())
}

/// `{record}.hea`
pub(crate) fn header_path(record: &Path) -> PathBuf {
    with_suffix(record, HEADER_EXTENSION)
}

/// Append `.ext` without replacing an existing dot in the record name.
fn with_suffix(record: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = record.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn decode_format16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn to_physical(digital: i16, spec: &SignalSpec) -> f32 {
    if digital == MISSING_SAMPLE {
        f32::NAN
    } else {
        ((digital as f64 - spec.baseline as f64) / spec.gain) as f32
    }
}

/// Raw pixel values in the image's native channel layout.
fn to_record_image(img: &DynamicImage) -> RecordImage {
    let pixels: Vec<f64> = match img {
        DynamicImage::ImageLuma16(buf)   => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageLumaA16(buf)  => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageRgb16(buf)    => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageRgba16(buf)   => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageRgb32F(buf)   => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        DynamicImage::ImageRgba32F(buf)  => buf.as_raw().iter().map(|&v| f64::from(v)).collect(),
        other                            => other.as_bytes().iter().map(|&v| f64::from(v)).collect(),
    };
    RecordImage::new(img.width(), img.height(), img.color().channel_count(), pixels)
}
