use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;

use crate::config::constants::{AUDIO_FILE_EXTENSION, AUDIO_FILE_PREFIX, AUDIO_URL_PREFIX};

/// Give up after this many consecutive name collisions
const MAX_CREATE_ATTEMPTS: usize = 16;

/// Writes generated audio into a single directory under unique names
///
/// Ids start at the wall clock in milliseconds and only ever increase within
/// the process, so two concurrent requests never get the same name. Files are
/// created with create-new semantics, so a name left over from an earlier
/// process is skipped instead of overwritten.
#[derive(Debug)]
pub struct AudioStore {
    dir: PathBuf,
    last_id: AtomicU64,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_id: AtomicU64::new(0),
        }
    }

    /// Create the store, making sure its directory exists
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(dir);
        tokio::fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let advance = |last: u64| now.max(last + 1);
        match self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
        {
            Ok(prev) | Err(prev) => advance(prev),
        }
    }

    /// Persist `bytes` and return the new file name
    pub async fn persist(&self, bytes: &[u8]) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let filename = file_name_for(self.next_id());
            let path = self.dir.join(&filename);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(filename = %filename, "Audio file name taken, trying next id");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;

            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }

            tracing::info!(filename = %filename, bytes = bytes.len(), "Saved podcast audio");
            return Ok(filename);
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free audio file name",
        ))
    }
}

fn file_name_for(id: u64) -> String {
    format!("{}_{}.{}", AUDIO_FILE_PREFIX, id, AUDIO_FILE_EXTENSION)
}

/// Public URL path for a persisted file
pub fn audio_url(filename: &str) -> String {
    format!("{}/{}", AUDIO_URL_PREFIX, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn is_podcast_name(name: &str) -> bool {
        name.strip_prefix("podcast_")
            .and_then(|rest| rest.strip_suffix(".mp3"))
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    }

    #[tokio::test]
    async fn test_persist_writes_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let store = AudioStore::open(temp_dir.path()).await.unwrap();

        let filename = store.persist(b"ID3 audio").await.unwrap();
        assert!(is_podcast_name(&filename), "unexpected name {}", filename);

        let written = std::fs::read(temp_dir.path().join(&filename)).unwrap();
        assert_eq!(written, b"ID3 audio");
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("public").join("audio");
        let store = AudioStore::open(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let store = AudioStore::new("unused");
        let mut last = 0;
        for _ in 0..1000 {
            let id = store.next_id();
            assert!(id > last);
            last = id;
        }
    }

    #[tokio::test]
    async fn test_concurrent_persists_get_distinct_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(AudioStore::open(temp_dir.path()).await.unwrap());

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.persist(format!("clip {}", i).as_bytes()).await })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            names.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(names.len(), 20);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 20);
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let store = AudioStore::open(temp_dir.path()).await.unwrap();

        // Occupy the next few ids the store could hand out
        let base = store.next_id();
        for id in base + 1..base + 4 {
            std::fs::write(temp_dir.path().join(file_name_for(id)), b"existing").unwrap();
        }
        store.last_id.store(base, Ordering::SeqCst);

        let filename = store.persist(b"new").await.unwrap();
        assert!(is_podcast_name(&filename));

        for id in base + 1..base + 4 {
            let kept = std::fs::read(temp_dir.path().join(file_name_for(id))).unwrap();
            assert_eq!(kept, b"existing");
        }
    }

    #[test]
    fn test_audio_url() {
        assert_eq!(audio_url("podcast_1.mp3"), "/audio/podcast_1.mp3");
    }
}
