#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use accident_explorer::data::archive::{DatasetSpec, Fetcher};
use accident_explorer::AcquireError;

pub const CSV_NAME: &str = "accidents.csv";

/// Ten accidents. Row 8 has no latitude, row 9 no weather condition.
pub const SAMPLE_CSV: &str = "\
ID,State,Severity,Weather_Condition,Start_Hour,Start_Month,Start_Lat,Start_Lng,City
A-1,NY,2,Rain,8,1,40.71,-74.00,New York
A-2,NY,3,Rain,17,1,40.73,-73.99,New York
A-3,CA,2,Clear,8,2,34.05,-118.24,Los Angeles
A-4,CA,4,Fog,12,2,37.77,-122.42,San Francisco
A-5,CA,2,Clear,17,3,32.72,-117.16,San Diego
A-6,TX,1,Fair,8,3,30.27,-97.74,Austin
A-7,TX,2,Fair,12,4,29.76,-95.37,Houston
A-8,OH,3,Snow,17,12,,-82.99,Columbus
A-9,OH,2,,8,12,41.50,-81.69,Cleveland
A-10,FL,2,Fair,12,6,25.76,-80.19,Miami
";

pub fn write_sample_csv(dir: &Path) -> std::path::PathBuf {
    let path = dir.join(CSV_NAME);
    std::fs::write(&path, SAMPLE_CSV).unwrap();
    path
}

/// A zip archive holding `body` under `entry`.
pub fn zip_bytes(entry: &str, body: &[u8]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(body).unwrap();
    zip.finish().unwrap().into_inner()
}

pub fn gzip_bytes(body: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(body).unwrap();
    enc.finish().unwrap()
}

pub fn spec(archive_name: &str) -> DatasetSpec {
    DatasetSpec {
        id: "accidents-test".into(),
        url: Some("https://example.invalid/accidents".into()),
        archive_name: archive_name.into(),
        file_name: CSV_NAME.into(),
    }
}

/// Serves a fixed body and counts calls. Safe to share across threads.
pub struct CountingFetcher {
    body: Vec<u8>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, _url: &str, sink: &mut dyn Write) -> Result<u64, AcquireError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.write_all(&self.body).unwrap();
        Ok(self.body.len() as u64)
    }
}

/// Writes half of its body, then fails like a dropped connection.
pub struct FailingFetcher {
    pub body: Vec<u8>,
}

impl Fetcher for FailingFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, AcquireError> {
        sink.write_all(&self.body[..self.body.len() / 2]).unwrap();
        Err(AcquireError::Fetch {
            url: url.to_string(),
            reason: "connection reset".into(),
        })
    }
}

/// Names of the files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
