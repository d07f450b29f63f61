// # CSV Config Store
//
// File-based implementation of ConfigStore, one CSV file per snapshot.
//
// ## File Layout
//
// For interface slot `n` under the base directory:
// - `ipconfig-{n}.csv`: production
// - `dr_ipconfig-{n}.csv`: dr (operator-supplied)
// - `previous_ipconfig-{n}.csv`: previous
//
// ## File Format
//
// ```text
// IPAddress,PrefixLength,IPv4DefaultGateway,PrimaryDNSServer,SecondaryDNSServer
// 10.0.0.5,24,10.0.0.1,10.0.0.2,10.0.0.3
// ```
//
// Quoted fields and a leading `#TYPE ...` line are accepted on read, so files
// exported by PowerShell load unchanged. Writes are atomic: the row goes to a
// temporary file that is then renamed over the target.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::snapshot::{Ipv4Snapshot, SnapshotKind};
use crate::traits::config_store::ConfigStore;

/// One CSV row, with the column names used on disk
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotRow {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
    #[serde(rename = "PrefixLength", default)]
    prefix_length: String,
    #[serde(rename = "IPv4DefaultGateway", default)]
    gateway: String,
    #[serde(rename = "PrimaryDNSServer", default)]
    primary_dns: String,
    #[serde(rename = "SecondaryDNSServer", default)]
    secondary_dns: String,
}

impl From<&Ipv4Snapshot> for SnapshotRow {
    fn from(snapshot: &Ipv4Snapshot) -> Self {
        let opt = |addr: Option<std::net::Ipv4Addr>| addr.map(|a| a.to_string()).unwrap_or_default();
        Self {
            ip_address: snapshot.address.to_string(),
            prefix_length: snapshot.prefix_length.to_string(),
            gateway: opt(snapshot.gateway),
            primary_dns: opt(snapshot.dns.map(|d| d.primary)),
            secondary_dns: opt(snapshot.dns.map(|d| d.secondary)),
        }
    }
}

impl TryFrom<SnapshotRow> for Ipv4Snapshot {
    type Error = Error;

    fn try_from(row: SnapshotRow) -> Result<Self, Error> {
        Ipv4Snapshot::parse_fields(
            &row.ip_address,
            &row.prefix_length,
            &row.gateway,
            &row.primary_dns,
            &row.secondary_dns,
        )
    }
}

/// CSV-file config store
///
/// # Example
///
/// ```rust,no_run
/// use drip_core::store::CsvConfigStore;
/// use drip_core::traits::ConfigStore;
/// use drip_core::snapshot::SnapshotKind;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = CsvConfigStore::new("/var/lib/drip");
///
///     // Reads /var/lib/drip/ipconfig-1.csv, None if the file is absent
///     let production = store.load(1, SnapshotKind::Production).await?;
///     println!("{production:?}");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfigStore {
    base_path: PathBuf,
}

impl CsvConfigStore {
    /// Create a store rooted at `base_path`
    ///
    /// The directory is created on the first write if it does not exist.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Base directory of the snapshot files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Full path of one snapshot file
    pub fn path_for(&self, slot: usize, kind: SnapshotKind) -> PathBuf {
        self.base_path.join(kind.file_name(slot))
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        temp.set_extension("tmp");
        temp
    }

    /// Parse the contents of a snapshot file
    fn parse(path: &Path, content: &str) -> Result<Ipv4Snapshot, Error> {
        let content = content.trim_start_matches('\u{feff}');

        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let row: SnapshotRow = reader
            .deserialize()
            .next()
            .ok_or_else(|| {
                Error::invalid_snapshot(format!("{} has no data row", path.display()))
            })?
            .map_err(|e| {
                Error::invalid_snapshot(format!("{} is not a valid snapshot: {}", path.display(), e))
            })?;

        Ipv4Snapshot::try_from(row).map_err(|e| match e {
            Error::InvalidSnapshot(msg) => {
                Error::invalid_snapshot(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Render a snapshot as header plus one row
    fn render(snapshot: &Ipv4Snapshot) -> Result<Vec<u8>, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .serialize(SnapshotRow::from(snapshot))
            .map_err(|e| Error::persist(format!("Failed to serialize snapshot: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| Error::persist(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Write bytes to `path` atomically
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), Error> {
        if !self.base_path.as_os_str().is_empty() && !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                Error::persist(format!(
                    "Failed to create snapshot directory {}: {}",
                    self.base_path.display(),
                    e
                ))
            })?;
        }

        // Write to temporary file first
        let temp_path = Self::temp_path(path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persist(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(bytes).await.map_err(|e| {
                Error::persist(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::persist(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::persist(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshot written to file: {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for CsvConfigStore {
    async fn load(&self, slot: usize, kind: SnapshotKind) -> Result<Option<Ipv4Snapshot>, Error> {
        let path = self.path_for(slot, kind);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No {} snapshot at {}", kind, path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read {}: {}", path.display(), e),
                )));
            }
        };

        Self::parse(&path, &content).map(Some)
    }

    async fn save(
        &self,
        slot: usize,
        kind: SnapshotKind,
        snapshot: &Ipv4Snapshot,
    ) -> Result<(), Error> {
        let path = self.path_for(slot, kind);
        let bytes = Self::render(snapshot)?;
        self.write_atomic(&path, &bytes).await
    }
}
