// ============================================================
// Layer 4 — WFDB Header Parsing
// ============================================================
// A challenge header looks like this:
//
//   00001_lr 12 100 1000
//   00001_lr.dat 16 1000.0(0)/mV 16 0 -119 1508 0 I
//   00001_lr.dat 16 1000.0(0)/mV 16 0 -55 723 0 II
//   ...
//   #Image: 00001_lr-0.png
//   #Dx: NORM, STTC
//
// Line 1 is the record line:
//   <name> <num_signals> [<fs> [<num_samples>]]
// followed by one signal line per lead:
//   <file> <format> <gain>(<baseline>)/<units> <adc_res>
//   <adc_zero> <init_value> <checksum> <block_size> <description>
// Every field after <format> is optional. Comment lines start
// with '#'; only the `Image:` and `Dx:` comments carry meaning.

use std::fmt::Write as _;
use std::path::Path;

use crate::domain::error::ChallengeError;
use crate::domain::record::{Header, SignalSpec};

/// Gain used when a header omits it or declares 0.
pub const DEFAULT_GAIN: f64 = 200.0;
const DEFAULT_FREQUENCY: f64 = 250.0;
const DEFAULT_UNITS: &str = "mV";

/// Parse header text. `path` only feeds error messages.
pub fn parse_header(text: &str, path: &Path) -> Result<Header, ChallengeError> {
    let fail = |reason: String| ChallengeError::Header { path: path.to_path_buf(), reason };

    let mut image_files = Vec::new();
    let mut dx          = Vec::new();
    let mut lines       = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix('#') {
            Some(comment) => {
                let comment = comment.trim();
                if let Some(list) = comment.strip_prefix("Image:") {
                    image_files.extend(split_list(list));
                } else if let Some(list) = comment.strip_prefix("Dx:") {
                    dx.extend(split_list(list));
                }
            }
            None => lines.push(line),
        }
    }

    let record_line = lines.first().ok_or_else(|| fail("missing record line".into()))?;
    let fields: Vec<&str> = record_line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(fail(format!("record line '{record_line}' has fewer than 2 fields")));
    }

    // "name/segments" is legal for multi-segment records
    let record_name = fields[0].split('/').next().unwrap_or(fields[0]).to_string();
    let num_signals: usize = fields[1]
        .parse()
        .map_err(|_| fail(format!("invalid signal count '{}'", fields[1])))?;
    let sampling_frequency = match fields.get(2) {
        Some(f) => leading_number(f)
            .ok_or_else(|| fail(format!("invalid sampling frequency '{f}'")))?,
        None => DEFAULT_FREQUENCY,
    };
    let num_samples = match fields.get(3) {
        Some(n) => n.parse().map_err(|_| fail(format!("invalid sample count '{n}'")))?,
        None => 0,
    };

    let signal_lines = &lines[1..];
    if signal_lines.len() < num_signals {
        return Err(fail(format!(
            "declares {num_signals} signals but has {} signal lines",
            signal_lines.len()
        )));
    }
    let signals = signal_lines[..num_signals]
        .iter()
        .map(|line| parse_signal_line(line).map_err(&fail))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        record_name,
        num_signals,
        sampling_frequency,
        num_samples,
        signals,
        image_files,
        dx,
    })
}

/// Render a header back to WFDB text. Inverse of `parse_header`.
pub fn render_header(header: &Header) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {} {}",
        header.record_name, header.num_signals, header.sampling_frequency, header.num_samples
    );
    for s in &header.signals {
        let _ = write!(
            out,
            "{} {} {}({})/{} {} {}",
            s.file_name, s.format, s.gain, s.baseline, s.units, s.adc_resolution, s.adc_zero
        );
        if let (Some(init), Some(checksum)) = (s.initial_value, s.checksum) {
            let _ = write!(out, " {} {} {} {}", init, checksum, s.block_size, s.description);
        }
        out.push('\n');
    }
    if !header.image_files.is_empty() {
        let _ = writeln!(out, "#Image: {}", header.image_files.join(", "));
    }
    if !header.dx.is_empty() {
        let _ = writeln!(out, "#Dx: {}", header.dx.join(", "));
    }
    out
}

fn parse_signal_line(line: &str) -> Result<SignalSpec, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(format!("signal line '{line}' has fewer than 2 fields"));
    }

    // "16x2", "16:3", "16+24": only the leading digits name the format
    let format: String = fields[1].chars().take_while(char::is_ascii_digit).collect();
    if format.is_empty() {
        return Err(format!("invalid storage format '{}'", fields[1]));
    }

    let (gain, baseline, units) = match fields.get(2) {
        Some(field) => parse_gain(field)?,
        None => (DEFAULT_GAIN, None, DEFAULT_UNITS.to_string()),
    };

    let int_field = |i: usize| -> Result<Option<i64>, String> {
        fields
            .get(i)
            .map(|f| f.parse::<i64>().map_err(|_| format!("invalid integer '{f}' in '{line}'")))
            .transpose()
    };

    let adc_resolution = int_field(3)?.unwrap_or(0) as u32;
    let adc_zero       = int_field(4)?.unwrap_or(0) as i32;
    let initial_value  = int_field(5)?.map(|v| v as i32);
    let checksum       = int_field(6)?.map(|v| v as i32);
    let block_size     = int_field(7)?.unwrap_or(0) as u32;
    let description    = fields.get(8..).map(|rest| rest.join(" ")).unwrap_or_default();

    Ok(SignalSpec {
        file_name: fields[0].to_string(),
        format,
        gain,
        baseline: baseline.unwrap_or(adc_zero),
        units,
        adc_resolution,
        adc_zero,
        initial_value,
        checksum,
        block_size,
        description,
    })
}

/// "1000.0(0)/mV" → (1000.0, Some(0), "mV")
fn parse_gain(field: &str) -> Result<(f64, Option<i32>, String), String> {
    let (gain_part, units) = match field.split_once('/') {
        Some((g, u)) => (g, u.to_string()),
        None => (field, DEFAULT_UNITS.to_string()),
    };
    let (gain_str, baseline) = match gain_part.split_once('(') {
        Some((g, rest)) => {
            let b = rest
                .trim_end_matches(')')
                .parse::<i32>()
                .map_err(|_| format!("invalid baseline in '{field}'"))?;
            (g, Some(b))
        }
        None => (gain_part, None),
    };
    let gain: f64 = gain_str.parse().map_err(|_| format!("invalid gain in '{field}'"))?;
    let gain = if gain == 0.0 { DEFAULT_GAIN } else { gain };
    Ok((gain, baseline, units))
}

/// "500/1000(0)" → 500.0
fn leading_number(field: &str) -> Option<f64> {
    let end = field
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(field.len());
    field[..end].parse().ok()
}

fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
