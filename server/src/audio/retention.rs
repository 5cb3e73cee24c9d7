use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// How long files are kept and how much space they may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Files strictly older than this are always deleted
    pub max_age: Duration,
    /// Budget for everything left after the age pass
    pub max_total_size_mb: u64,
}

impl RetentionPolicy {
    /// Generated podcasts: one day, 100 MB
    pub fn audio_default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 3600),
            max_total_size_mb: 100,
        }
    }

    /// Rolled log files: 30 days, 1000 MB
    pub fn logs_default() -> Self {
        Self {
            max_age: Duration::from_secs(30 * 86400),
            max_total_size_mb: 1000,
        }
    }

    fn max_total_bytes(&self) -> u64 {
        self.max_total_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub deleted_count: usize,
    /// Directory size before anything was deleted
    pub total_size_mb: f64,
    /// Directory size after the sweep
    pub remaining_size_mb: f64,
}

struct FileEntry {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Sweep `dir` against `policy` using the current time
pub async fn sweep(dir: &Path, policy: &RetentionPolicy) -> io::Result<SweepReport> {
    sweep_at(dir, policy, SystemTime::now()).await
}

/// Sweep `dir` as if the current time were `now`
///
/// Phase one deletes every file older than `max_age`. Phase two deletes the
/// survivors oldest-first until the remaining total fits the size budget.
/// Files that vanish between listing and deletion are skipped, since
/// requests may be writing into the same directory.
pub async fn sweep_at(
    dir: &Path,
    policy: &RetentionPolicy,
    now: SystemTime,
) -> io::Result<SweepReport> {
    let mut files = match list_files(dir).await {
        Ok(files) => files,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SweepReport::default()),
        Err(e) => return Err(e),
    };

    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    let mut remaining_bytes = total_bytes;
    let mut deleted_count = 0;

    tracing::debug!(
        dir = ?dir,
        files = files.len(),
        total_size_mb = to_mb(total_bytes),
        "Starting retention sweep"
    );

    // Phase one: age
    let mut survivors = Vec::with_capacity(files.len());
    for file in files.drain(..) {
        let age = now.duration_since(file.modified).unwrap_or_default();
        if age > policy.max_age {
            match remove(&file).await {
                Removal::Deleted => {
                    deleted_count += 1;
                    remaining_bytes = remaining_bytes.saturating_sub(file.size);
                    tracing::info!(
                        path = ?file.path,
                        age_hours = age.as_secs() / 3600,
                        "Deleted expired file"
                    );
                }
                Removal::Gone => remaining_bytes = remaining_bytes.saturating_sub(file.size),
                Removal::Failed => {}
            }
        } else {
            survivors.push(file);
        }
    }

    // Phase two: size budget, oldest first
    let max_bytes = policy.max_total_bytes();
    if remaining_bytes > max_bytes {
        tracing::warn!(
            total_size_mb = to_mb(remaining_bytes),
            max_size_mb = policy.max_total_size_mb,
            "Directory exceeds size limit, deleting oldest files"
        );

        survivors.sort_by_key(|f| f.modified);
        for file in &survivors {
            if remaining_bytes <= max_bytes {
                break;
            }
            match remove(file).await {
                Removal::Deleted => {
                    deleted_count += 1;
                    remaining_bytes = remaining_bytes.saturating_sub(file.size);
                    tracing::info!(
                        path = ?file.path,
                        size_bytes = file.size,
                        "Deleted file to enforce size limit"
                    );
                }
                Removal::Gone => remaining_bytes = remaining_bytes.saturating_sub(file.size),
                Removal::Failed => {}
            }
        }
    }

    let report = SweepReport {
        deleted_count,
        total_size_mb: to_mb(total_bytes),
        remaining_size_mb: to_mb(remaining_bytes),
    };

    if deleted_count > 0 {
        tracing::info!(
            dir = ?dir,
            deleted_files = report.deleted_count,
            remaining_size_mb = report.remaining_size_mb,
            "Retention sweep completed"
        );
    }

    Ok(report)
}

/// Run `sweep` now and then every `every` until the task is aborted
pub fn spawn_sweeper(
    dir: PathBuf,
    policy: RetentionPolicy,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&dir, &policy).await {
                tracing::error!(error = %e, dir = ?dir, "Retention sweep failed");
            }
        }
    })
}

async fn list_files(dir: &Path) -> io::Result<Vec<FileEntry>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(FileEntry {
            path: entry.path(),
            modified: metadata.modified()?,
            size: metadata.len(),
        });
    }

    Ok(files)
}

enum Removal {
    Deleted,
    /// Someone else removed it first
    Gone,
    Failed,
}

async fn remove(file: &FileEntry) -> Removal {
    match tokio::fs::remove_file(&file.path).await {
        Ok(()) => Removal::Deleted,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Removal::Gone,
        Err(e) => {
            tracing::warn!(path = ?file.path, error = %e, "Failed to delete file");
            Removal::Failed
        }
    }
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, size: usize, modified: SystemTime) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![b'x'; size]).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_system_time(modified)).unwrap();
        path
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 3600)
    }

    #[tokio::test]
    async fn test_deletes_only_expired_files() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();

        let old = write_file(temp_dir.path(), "podcast_1.mp3", 10, now - hours(25));
        let recent = write_file(temp_dir.path(), "podcast_2.mp3", 10, now - hours(23));
        let fresh = write_file(temp_dir.path(), "podcast_3.mp3", 10, now - hours(1));

        let report = sweep_at(temp_dir.path(), &RetentionPolicy::audio_default(), now)
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 1);
        assert!(!old.exists());
        assert!(recent.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_enforces_budget_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let mb = BYTES_PER_MB as usize;

        let oldest = write_file(temp_dir.path(), "a.mp3", mb, now - hours(5));
        let middle = write_file(temp_dir.path(), "b.mp3", mb, now - hours(3));
        let newest = write_file(temp_dir.path(), "c.mp3", mb, now - hours(1));

        let policy = RetentionPolicy {
            max_age: hours(24),
            max_total_size_mb: 2,
        };
        let report = sweep_at(temp_dir.path(), &policy, now).await.unwrap();

        assert_eq!(report.deleted_count, 1);
        assert!(!oldest.exists());
        assert!(middle.exists());
        assert!(newest.exists());
        assert!((report.total_size_mb - 3.0).abs() < f64::EPSILON);
        assert!((report.remaining_size_mb - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_expired_files_count_toward_freed_space() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let mb = BYTES_PER_MB as usize;

        // The expired file alone pushes the directory over budget
        let expired = write_file(temp_dir.path(), "old.mp3", 2 * mb, now - hours(30));
        let kept = write_file(temp_dir.path(), "new.mp3", mb, now - hours(1));

        let policy = RetentionPolicy {
            max_age: hours(24),
            max_total_size_mb: 2,
        };
        let report = sweep_at(temp_dir.path(), &policy, now).await.unwrap();

        assert_eq!(report.deleted_count, 1);
        assert!(!expired.exists());
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_under_budget_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        write_file(temp_dir.path(), "a.mp3", 100, now - hours(2));
        write_file(temp_dir.path(), "b.mp3", 100, now);

        let report = sweep_at(temp_dir.path(), &RetentionPolicy::audio_default(), now)
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_ignores_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let sub = temp_dir.path().join("archives");
        fs::create_dir(&sub).unwrap();
        filetime::set_file_mtime(&sub, FileTime::from_system_time(now - hours(48))).unwrap();

        let report = sweep_at(temp_dir.path(), &RetentionPolicy::audio_default(), now)
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert!(sub.exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_report() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let report = sweep(&missing, &RetentionPolicy::audio_default()).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_log_policy_uses_thirty_days() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let old = write_file(temp_dir.path(), "application.log.2024-01-01", 10, now - hours(24 * 31));
        let recent = write_file(temp_dir.path(), "application.log.2024-02-01", 10, now - hours(24 * 29));

        sweep_at(temp_dir.path(), &RetentionPolicy::logs_default(), now)
            .await
            .unwrap();

        assert!(!old.exists());
        assert!(recent.exists());
    }
}
