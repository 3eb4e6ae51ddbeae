//! JSON dataset store
//!
//! Files are JSON objects keyed by checksummed address. Writes go to a
//! temporary sibling first and are renamed into place, so a failed run
//! never leaves a half-written file behind.

use alloy_primitives::Address;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Entries keyed by checksummed address
pub type AddressMap<T> = BTreeMap<String, T>;

/// EIP-55 form used for every key and address field
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Archive files are named after the day the archived data describes
pub fn archive_date(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::days(1)).date_naive()
}

#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
}

impl Dataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a JSON file; a missing file yields the default value
    pub async fn load_or_default<T>(&self, relative: impl AsRef<Path>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(relative);
        match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .wrap_err_with(|| format!("Corrupt dataset file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, starting empty", path.display());
                Ok(T::default())
            }
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Replace a JSON file in one rename
    pub async fn write_json<T: Serialize>(&self, relative: impl AsRef<Path>, value: &T) -> Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .wrap_err_with(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .wrap_err_with(|| format!("Failed to move {} into place", path.display()))?;

        debug!("💾 Wrote {}", path.display());
        Ok(())
    }

    /// Move the current file to `{archive_dir}/{date}.json`
    ///
    /// This is a move, not a copy: until the next successful write there is
    /// no current file. Returns `None` when there was nothing to archive.
    pub async fn archive(
        &self,
        current: impl AsRef<Path>,
        archive_dir: impl AsRef<Path>,
        date: NaiveDate,
    ) -> Result<Option<PathBuf>> {
        let source = self.path(current);
        if !fs::try_exists(&source).await? {
            warn!("No {} to archive", source.display());
            return Ok(None);
        }

        let dir = self.path(archive_dir);
        fs::create_dir_all(&dir).await?;

        let target = dir.join(format!("{}.json", date.format("%Y-%m-%d")));
        fs::rename(&source, &target)
            .await
            .wrap_err_with(|| format!("Failed to archive {}", source.display()))?;

        info!("📦 Archived {} -> {}", source.display(), target.display());
        Ok(Some(target))
    }
}
