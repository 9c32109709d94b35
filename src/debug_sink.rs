//! DebugSink — persists one [`DebugRecord`] per pipeline run as a JSON file
//! when `debug_enabled` is set, for offline inspection of Strict/Repair/
//! Fallback behavior. Every failure here is logged and swallowed: debug
//! capture must never affect the pipeline's own success or latency.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::types::DebugRecord;

/// Records are retained for this long before [`DebugSink::sweep`] deletes them.
pub const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Writes [`DebugRecord`]s to a directory, one JSON file per operation.
pub struct DebugSink {
    dir: PathBuf,
}

impl DebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(record: &DebugRecord) -> String {
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
        format!("{timestamp}-{}.json", record.id.short())
    }

    /// Serializes and atomically persists `record`. Logs and returns on any
    /// failure; never surfaces an error to the pipeline.
    pub async fn write(&self, record: &DebugRecord) {
        if let Err(e) = self.try_write(record).await {
            tracing::warn!(error = %e, "failed to persist debug record");
        }
    }

    async fn try_write(&self, record: &DebugRecord) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let final_path = self.dir.join(Self::file_name(record));
        let temp_path = self.dir.join(format!("{}.tmp", record.id.short()));

        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, &final_path).await?;
        Ok(())
    }

    /// Deletes persisted records older than [`RETENTION`]. Skips entries
    /// that cannot be read or whose names don't match the expected shape,
    /// rather than aborting the whole sweep.
    pub async fn sweep(&self) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else { return };
        let cutoff = std::time::SystemTime::now() - RETENTION;

        loop {
            let next = entries.next_entry().await;
            let Ok(Some(entry)) = next else { break };
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            if modified < cutoff {
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
    }

    /// Lists persisted debug-record file paths, skipping unreadable entries.
    pub async fn list(&self) -> Vec<PathBuf> {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else { return Vec::new() };
        let mut files = Vec::new();
        loop {
            let next = entries.next_entry().await;
            let Ok(Some(entry)) = next else { break };
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        files
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
