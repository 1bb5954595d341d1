//! Maintenance sweeps
//!
//! The orphan sweep is a pure filesystem pass: it never consults the stream
//! table. Files of live streams are rewritten every few seconds by their
//! transcoder, so they never look stale.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::camera::CameraId;

const STREAM_FILE_PREFIX: &str = "camera_";
const PLAYLIST_EXTENSION: &str = ".m3u8";
const SEGMENT_EXTENSION: &str = ".ts";

/// Running streams at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveStreams {
    pub active: usize,
    pub cameras: Vec<CameraId>,
}

/// Result of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub cleaned_streams: usize,
    pub removed_files: usize,
    pub active: ActiveStreams,
}

/// Whether a file name belongs to a stream (playlist or segment)
pub fn is_stream_file(name: &str) -> bool {
    name.starts_with(STREAM_FILE_PREFIX)
        && (name.ends_with(PLAYLIST_EXTENSION) || name.ends_with(SEGMENT_EXTENSION))
}

/// Remove stream files in `dir` last modified more than `max_age` ago
///
/// Returns the number of files removed by this call. Files that disappear
/// while the sweep runs are skipped silently; any other per-file failure is
/// logged and the sweep moves on.
pub async fn sweep_orphaned_files(dir: &Path, max_age: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to list streams directory");
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                break;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_stream_file(name) {
            continue;
        }

        let path = entry.path();
        let modified = match tokio::fs::metadata(&path).await.and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to stat stream file");
                continue;
            }
        };

        // Clock skew puts the file in the future; treat it as fresh
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(file = %path.display(), age_secs = age.as_secs(), "Removed stale stream file");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to remove stream file");
            }
        }
    }

    if removed > 0 {
        tracing::info!(dir = %dir.display(), removed = removed, "Orphaned stream files removed");
    }

    removed
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File, FileTimes};

    use super::*;

    fn write_aged(dir: &Path, name: &str, age: Duration) {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let when = SystemTime::now() - age;
        file.set_times(FileTimes::new().set_modified(when).set_accessed(when))
            .unwrap();
    }

    #[test]
    fn test_is_stream_file() {
        assert!(is_stream_file("camera_7.m3u8"));
        assert!(is_stream_file("camera_7_001.ts"));
        assert!(!is_stream_file("camera_7.mp4"));
        assert!(!is_stream_file("index.m3u8"));
        assert!(!is_stream_file("stream_7.ts"));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_stream_files() {
        let dir = tempfile::tempdir().unwrap();
        let hour = Duration::from_secs(3600);

        write_aged(dir.path(), "camera_1.m3u8", hour);
        write_aged(dir.path(), "camera_1_000.ts", hour);
        write_aged(dir.path(), "camera_2.m3u8", Duration::ZERO);
        write_aged(dir.path(), "notes.txt", hour);

        let removed = sweep_orphaned_files(dir.path(), Duration::from_secs(600)).await;

        assert_eq!(removed, 2);
        assert!(!dir.path().join("camera_1.m3u8").exists());
        assert!(!dir.path().join("camera_1_000.ts").exists());
        assert!(dir.path().join("camera_2.m3u8").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_sweep_twice_removes_once() {
        let dir = tempfile::tempdir().unwrap();
        write_aged(dir.path(), "camera_3_004.ts", Duration::from_secs(3600));

        let first = sweep_orphaned_files(dir.path(), Duration::from_secs(60)).await;
        let second = sweep_orphaned_files(dir.path(), Duration::from_secs(60)).await;

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sweeps_tolerate_vanishing_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            write_aged(dir.path(), &format!("camera_5_{:03}.ts", i), Duration::from_secs(3600));
        }

        let (a, b) = tokio::join!(
            sweep_orphaned_files(dir.path(), Duration::from_secs(60)),
            sweep_orphaned_files(dir.path(), Duration::from_secs(60)),
        );

        assert_eq!(a + b, 50);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("camera_9.ts")).unwrap();

        let removed = sweep_orphaned_files(dir.path(), Duration::ZERO).await;

        assert_eq!(removed, 0);
        assert!(dir.path().join("camera_9.ts").is_dir());
    }

    #[tokio::test]
    async fn test_sweep_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert_eq!(sweep_orphaned_files(&missing, Duration::ZERO).await, 0);
    }

    #[test]
    fn test_report_serialization() {
        let report = MaintenanceReport {
            cleaned_streams: 1,
            removed_files: 3,
            active: ActiveStreams {
                active: 2,
                cameras: vec![4, 7],
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cleanedStreams": 1,
                "removedFiles": 3,
                "active": { "active": 2, "cameras": [4, 7] }
            })
        );
    }
}
