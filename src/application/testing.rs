// Fixtures shared by the use-case tests: an in-memory record source
// and a writer for small on-disk challenge records.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma};
use std::{
    cell::Cell,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::data::loader::WfdbSource;
use crate::domain::record::{DigitizedSignal, Header, RecordImage, ReferenceSignal};
use crate::domain::traits::RecordSource;

/// Folder the fake records pretend to live in.
pub const FAKE_FOLDER: &str = "data";

#[derive(Debug, Clone)]
pub struct FakeRecord {
    header: Header,
    images: Vec<RecordImage>,
    signal: ReferenceSignal,
}

impl FakeRecord {
    /// One 10×10 image of constant `value` and a `leads × samples`
    /// reference signal.
    pub fn constant(value: f64, leads: usize, samples: usize) -> Self {
        Self {
            header: Header {
                record_name:        String::new(),
                num_signals:        leads,
                sampling_frequency: 500.0,
                num_samples:        samples,
                signals:            Vec::new(),
                image_files:        vec!["image.png".to_string()],
                dx:                 Vec::new(),
            },
            images: vec![RecordImage::constant(10, 10, value)],
            signal: ReferenceSignal::from_sample_major(samples, leads, &vec![0.5; leads * samples]),
        }
    }

    /// Override only the dimensions the header declares.
    pub fn with_header_shape(mut self, leads: usize, samples: usize) -> Self {
        self.header.num_signals = leads;
        self.header.num_samples = samples;
        self
    }

    pub fn labelled(mut self, dx: &[&str]) -> Self {
        self.header.dx = dx.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Default)]
pub struct FakeSource {
    records:      BTreeMap<PathBuf, FakeRecord>,
    image_loads:  Cell<usize>,
    signal_loads: Cell<usize>,
}

impl FakeSource {
    pub fn with(mut self, name: &str, mut record: FakeRecord) -> Self {
        record.header.record_name = name.to_string();
        self.records.insert(Path::new(FAKE_FOLDER).join(name), record);
        self
    }

    pub fn image_loads(&self) -> usize {
        self.image_loads.get()
    }

    pub fn signal_loads(&self) -> usize {
        self.signal_loads.get()
    }

    fn get(&self, record: &Path) -> Result<&FakeRecord> {
        self.records
            .get(record)
            .ok_or_else(|| anyhow!("no such record '{}'", record.display()))
    }
}

impl RecordSource for FakeSource {
    fn find_records(&self, data_folder: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .records
            .keys()
            .filter_map(|k| k.strip_prefix(data_folder).ok())
            .map(Path::to_path_buf)
            .collect())
    }

    fn load_header(&self, record: &Path) -> Result<Header> {
        Ok(self.get(record)?.header.clone())
    }

    fn load_images(&self, record: &Path) -> Result<Vec<RecordImage>> {
        self.image_loads.set(self.image_loads.get() + 1);
        Ok(self.get(record)?.images.clone())
    }

    fn load_signal(&self, record: &Path) -> Result<ReferenceSignal> {
        self.signal_loads.set(self.signal_loads.get() + 1);
        Ok(self.get(record)?.signal.clone())
    }
}

/// Write `<dir>/<name>.{hea,dat,png}`: a 10×10 PNG of constant `value`,
/// a `leads × samples` format-16 signal and the given dx labels.
pub fn write_record(dir: &Path, name: &str, value: u8, leads: usize, samples: usize, dx: &[&str]) {
    fs::create_dir_all(dir).unwrap();

    let image_name = format!("{name}-0.png");
    GrayImage::from_pixel(10, 10, Luma([value]))
        .save(dir.join(&image_name))
        .unwrap();

    let values = (0..samples * leads).map(|i| (i % 200) as i16 - 100).collect();
    let signal = DigitizedSignal::new(samples, leads, values);
    let template = Header {
        record_name:        name.to_string(),
        num_signals:        leads,
        sampling_frequency: 500.0,
        num_samples:        samples,
        signals:            Vec::new(),
        image_files:        Vec::new(),
        dx:                 Vec::new(),
    };
    let dx: Vec<String> = dx.iter().map(|s| s.to_string()).collect();
    WfdbSource::new()
        .write_record(&dir.join(name), &template, &signal, &dx)
        .unwrap();

    let header_path = dir.join(format!("{name}.hea"));
    let mut text = fs::read_to_string(&header_path).unwrap();
    text.push_str(&format!("#Image: {image_name}\n"));
    fs::write(header_path, text).unwrap();
}
