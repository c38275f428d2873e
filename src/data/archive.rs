//! Local cache of downloaded dataset archives.
//!
//! The extracted tabular file is the cache entry: if it exists the dataset is
//! available and nothing is fetched. Both the archive and the extracted file
//! are written to a temporary file in the cache directory and renamed into
//! place, so a reader only ever sees complete files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::AcquireError;

// ---------------------------------------------------------------------------
// Dataset identity
// ---------------------------------------------------------------------------

/// A dataset bound to a remote archive and the file expected inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Stable identifier, used for log messages.
    pub id: String,
    /// Remote location of the archive. Only needed on a cache miss.
    pub url: Option<String>,
    /// File name the downloaded archive is stored under.
    pub archive_name: String,
    /// Name of the tabular file inside the archive.
    pub file_name: String,
}

/// Compression container, detected from the archive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Gzip,
}

impl ArchiveFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(Self::Zip),
            "gz" | "gzip" => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// Where a cache entry is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Absent,
    /// Archive downloaded but not (or no longer) extracted.
    ArchiveOnly,
    Extracted,
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Retrieves a remote resource into a writer. The only blocking network seam.
pub trait Fetcher {
    /// Stream the body at `url` into `sink`, returning the bytes written.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, AcquireError>;
}

/// HTTP(S) GET with a whole-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, AcquireError> {
        let fail = |reason: String| AcquireError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = ureq::get(url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, r) => fail(format!("server returned {code} {}", r.status_text())),
                ureq::Error::Transport(t) => fail(t.to_string()),
            })?;
        io::copy(&mut response.into_reader(), sink)
            .map_err(|e| fail(format!("download interrupted: {e}")))
    }
}

// ---------------------------------------------------------------------------
// ArchiveCache
// ---------------------------------------------------------------------------

/// Manages the cache directory holding downloaded archives and their contents.
#[derive(Debug, Clone)]
pub struct ArchiveCache<F = HttpFetcher> {
    dir: PathBuf,
    fetcher: F,
}

impl ArchiveCache<HttpFetcher> {
    pub fn with_http(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(dir, HttpFetcher::new(timeout))
    }
}

impl<F: Fetcher> ArchiveCache<F> {
    pub fn new(dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn archive_path(&self, spec: &DatasetSpec) -> PathBuf {
        self.dir.join(&spec.archive_name)
    }

    pub fn tabular_path(&self, spec: &DatasetSpec) -> PathBuf {
        self.dir.join(&spec.file_name)
    }

    pub fn status(&self, spec: &DatasetSpec) -> CacheStatus {
        if self.tabular_path(spec).is_file() {
            CacheStatus::Extracted
        } else if self.archive_path(spec).is_file() {
            CacheStatus::ArchiveOnly
        } else {
            CacheStatus::Absent
        }
    }

    /// Make sure the tabular file exists locally and return its path.
    ///
    /// A present tabular file is a hit and touches nothing else, even when the
    /// archive is gone. On a miss the archive is fetched and extracted.
    pub fn ensure(&self, spec: &DatasetSpec) -> Result<PathBuf, AcquireError> {
        let target = self.tabular_path(spec);
        if target.is_file() {
            log::debug!("cache hit for {} at {}", spec.id, target.display());
            return Ok(target);
        }

        let url = spec.url.as_deref().ok_or_else(|| AcquireError::Fetch {
            url: String::new(),
            reason: format!("no remote location configured for dataset {}", spec.id),
        })?;
        let format = ArchiveFormat::from_name(&spec.archive_name).ok_or_else(|| {
            AcquireError::corrupt(self.archive_path(spec), "unrecognised archive extension")
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| AcquireError::io(&self.dir, e))?;

        log::info!("cache miss for {}, fetching {url}", spec.id);
        let archive = self.download(url, &self.archive_path(spec))?;
        self.extract(format, &archive, &spec.file_name, &target)?;
        log::info!("dataset {} ready at {}", spec.id, target.display());
        Ok(target)
    }

    /// Remove the archive and the extracted file. Absent files are not an error.
    pub fn evict(&self, spec: &DatasetSpec) -> Result<(), AcquireError> {
        for path in [self.tabular_path(spec), self.archive_path(spec)] {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(AcquireError::io(path, e)),
            }
        }
        Ok(())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, AcquireError> {
        let mut temp = self.temp_file()?;
        let bytes = self.fetcher.fetch(url, temp.as_file_mut())?;
        log::debug!("downloaded {bytes} bytes from {url}");
        self.persist(temp, dest)
    }

    fn extract(
        &self,
        format: ArchiveFormat,
        archive: &Path,
        file_name: &str,
        dest: &Path,
    ) -> Result<PathBuf, AcquireError> {
        let file = fs::File::open(archive).map_err(|e| AcquireError::io(archive, e))?;
        let mut temp = self.temp_file()?;

        match format {
            ArchiveFormat::Zip => {
                let mut zip = zip::ZipArchive::new(file).map_err(|e| AcquireError::corrupt(archive, e))?;
                let index = (0..zip.len())
                    .find(|&i| {
                        zip.by_index(i)
                            .map(|entry| !entry.is_dir() && entry_base_name(entry.name()) == file_name)
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| {
                        AcquireError::corrupt(archive, format!("no entry named {file_name}"))
                    })?;
                let mut entry = zip.by_index(index).map_err(|e| AcquireError::corrupt(archive, e))?;
                copy_decompressed(&mut entry, temp.as_file_mut(), archive)?;
            }
            ArchiveFormat::Gzip => {
                let mut decoder = GzDecoder::new(file);
                copy_decompressed(&mut decoder, temp.as_file_mut(), archive)?;
            }
        }

        self.persist(temp, dest)
    }

    fn temp_file(&self) -> Result<NamedTempFile, AcquireError> {
        tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.dir)
            .map_err(|e| AcquireError::io(&self.dir, e))
    }

    /// Flush and atomically rename into place. A concurrent writer that got
    /// there first is overwritten with equivalent content.
    fn persist(&self, mut temp: NamedTempFile, dest: &Path) -> Result<PathBuf, AcquireError> {
        temp.as_file_mut()
            .sync_all()
            .map_err(|e| AcquireError::io(temp.path(), e))?;
        temp.persist(dest)
            .map_err(|e| AcquireError::io(dest, e.error))?;
        Ok(dest.to_path_buf())
    }
}

fn entry_base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn copy_decompressed(
    reader: &mut dyn Read,
    sink: &mut fs::File,
    archive: &Path,
) -> Result<u64, AcquireError> {
    io::copy(reader, sink).map_err(|e| AcquireError::corrupt(archive, format!("decompression failed: {e}")))
}
