//! JSON file attendance source
//!
//! Keeps the whole snapshot in one JSON document:
//!
//! ```json
//! { "reservations": [ ... ], "attendance": [ ... ] }
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the original.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::memory::ensure_bookable;
use crate::domain::{AttendanceEvent, AttendanceSource, DomainResult, Reservation, Snapshot};
use crate::shared::errors::InfraError;

pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is an empty snapshot.
    async fn read(&self) -> Result<Snapshot, InfraError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Snapshot::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Data file not found, starting empty");
                Ok(Snapshot::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), InfraError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceSource for JsonFileStore {
    async fn fetch_all(&self) -> DomainResult<Snapshot> {
        Ok(self.read().await?)
    }

    async fn append_attendance_event(&self, event: AttendanceEvent) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read().await?;
        snapshot.attendance.push(event);
        self.write(&snapshot).await?;
        Ok(())
    }

    async fn save_reservation(&self, reservation: Reservation) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read().await?;
        ensure_bookable(&snapshot.reservations, &reservation)?;
        snapshot.reservations.push(reservation);
        self.write(&snapshot).await?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────
