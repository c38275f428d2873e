use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;

const CSV_NAME: &str = "US_Accidents_sample100k.csv";
const ZIP_NAME: &str = "US_Accidents_sample100k.zip";
const ROWS: usize = 2_000;

/// (state, centre latitude, centre longitude)
const STATES: &[(&str, f64, f64)] = &[
    ("CA", 36.7, -119.4),
    ("TX", 31.0, -99.9),
    ("FL", 27.8, -81.7),
    ("NY", 42.9, -75.5),
    ("OH", 40.4, -82.9),
];

/// (condition, relative weight)
const WEATHER: &[(&str, u64)] = &[
    ("Fair", 40),
    ("Clear", 20),
    ("Cloudy", 12),
    ("Mostly Cloudy", 8),
    ("Light Rain", 7),
    ("Rain", 4),
    ("Fog", 3),
    ("Haze", 2),
    ("Light Snow", 2),
    ("Snow", 1),
    ("Thunderstorm", 1),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn weighted<'a>(&mut self, table: &[(&'a str, u64)]) -> &'a str {
        let total: u64 = table.iter().map(|&(_, w)| w).sum();
        let mut pick = self.below(total);
        for &(name, weight) in table {
            if pick < weight {
                return name;
            }
            pick -= weight;
        }
        table[table.len() - 1].0
    }
}

/// Rush-hour peaks at 8:00 and 17:00.
fn sample_hour(rng: &mut SimpleRng) -> i64 {
    let peak = if rng.next_f64() < 0.5 { 8.0 } else { 17.0 };
    (rng.gauss(peak, 3.0).round() as i64).rem_euclid(24)
}

fn sample_severity(rng: &mut SimpleRng) -> u8 {
    match rng.below(100) {
        0..=4 => 1,
        5..=79 => 2,
        80..=94 => 3,
        _ => 4,
    }
}

fn write_csv(rng: &mut SimpleRng) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "ID",
        "Severity",
        "Start_Time",
        "Start_Lat",
        "Start_Lng",
        "City",
        "State",
        "Weather_Condition",
        "Start_Hour",
        "Start_Month",
    ])?;

    for i in 0..ROWS {
        let (state, lat0, lng0) = STATES[rng.below(STATES.len() as u64) as usize];
        let hour = sample_hour(rng);
        let month = rng.below(12) as i64 + 1;
        let day = rng.below(28) + 1;
        // About 2% of rows lose their coordinates, 3% their weather.
        let (lat, lng) = if rng.below(50) == 0 {
            (String::new(), String::new())
        } else {
            (
                format!("{:.5}", rng.gauss(lat0, 1.2)),
                format!("{:.5}", rng.gauss(lng0, 1.5)),
            )
        };
        let weather = if rng.below(33) == 0 {
            ""
        } else {
            rng.weighted(WEATHER)
        };

        writer.write_record([
            format!("A-{}", i + 1),
            sample_severity(rng).to_string(),
            format!("2022-{month:02}-{day:02} {hour:02}:{:02}:00", rng.below(60)),
            lat,
            lng,
            format!("{state}-City-{}", rng.below(8)),
            state.to_string(),
            weather.to_string(),
            hour.to_string(),
            month.to_string(),
        ])?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV writer: {}", e.error()))
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let csv_bytes = write_csv(&mut rng)?;

    let csv_path = out_dir.join(CSV_NAME);
    std::fs::write(&csv_path, &csv_bytes)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let zip_path = out_dir.join(ZIP_NAME);
    let file =
        File::create(&zip_path).with_context(|| format!("creating {}", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(
        CSV_NAME,
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated),
    )?;
    zip.write_all(&csv_bytes)?;
    zip.finish()?;

    println!(
        "Wrote {ROWS} accident records to {} and {}",
        csv_path.display(),
        zip_path.display()
    );
    Ok(())
}
