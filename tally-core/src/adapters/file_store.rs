//! settings.json store with cross-process locking

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use fs2::FileExt;

use crate::config::Config;
use crate::domain::{Error, Result};
use crate::ports::ConfigStore;

const LOCK_FILE: &str = "settings.lock";

/// Retry configuration for the settings lock
const MAX_RETRIES: u32 = 6;
const INITIAL_RETRY_DELAY_MS: u64 = 25;

/// Config store backed by `<tally_dir>/settings.json`
///
/// Updates hold an exclusive `fs2` lock on `settings.lock` for the whole
/// read-modify-write, so concurrent imports merging account keys into the
/// same profile serialize instead of overwriting each other.
pub struct FileConfigStore {
    tally_dir: PathBuf,
    // serializes writers inside this process; fs2 handles the rest
    guard: Mutex<()>,
}

impl FileConfigStore {
    pub fn new(tally_dir: &Path) -> Self {
        Self {
            tally_dir: tally_dir.to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn tally_dir(&self) -> &Path {
        &self.tally_dir
    }

    /// Take the lock file, backing off while another process holds it
    fn lock(&self) -> Result<File> {
        std::fs::create_dir_all(&self.tally_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.tally_dir.join(LOCK_FILE))?;

        for attempt in 0..MAX_RETRIES {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(file),
                Err(e) if attempt < MAX_RETRIES - 1 => {
                    // 25ms, 50ms, 100ms, ...
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Settings locked, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(_) => break,
            }
        }

        // last resort: block until the other writer is done
        file.lock_exclusive()?;
        Ok(file)
    }

    fn apply(&self, change: &mut dyn FnMut(&mut Config) -> Result<()>) -> Result<Config> {
        let mut config = Config::load_strict(&self.tally_dir)?;
        change(&mut config)?;
        config.save(&self.tally_dir)?;
        Ok(config)
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Config> {
        Config::load(&self.tally_dir)
    }

    fn update(&self, change: &mut dyn FnMut(&mut Config) -> Result<()>) -> Result<Config> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Other("settings lock poisoned".to_string()))?;
        let lock = self.lock()?;

        let result = self.apply(change);

        if let Err(e) = FileExt::unlock(&lock) {
            tracing::warn!(error = %e, "Failed to release settings lock");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_failed_change_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(dir.path());

        let result = store.update(&mut |config| {
            config.default_account = Some("x".to_string());
            Err(Error::config("nope"))
        });
        assert!(result.is_err());
        assert!(!Config::settings_path(dir.path()).exists());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileConfigStore::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .update(&mut |config| {
                            config.categories.push(crate::domain::Category {
                                id: i,
                                name: format!("c{}", i),
                                parent_id: None,
                            });
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let config = store.load().unwrap();
        assert_eq!(config.categories.len(), 8);
    }
}
