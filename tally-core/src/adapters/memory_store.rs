//! In-memory config store

use std::sync::Mutex;

use crate::config::Config;
use crate::domain::{Error, Result};
use crate::ports::ConfigStore;

/// Keeps the configuration in memory; nothing touches disk
#[derive(Default)]
pub struct MemoryConfigStore {
    config: Mutex<Config>,
}

impl MemoryConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Config> {
        let config = self
            .config
            .lock()
            .map_err(|_| Error::Other("config lock poisoned".to_string()))?;
        Ok(config.clone())
    }

    fn update(&self, change: &mut dyn FnMut(&mut Config) -> Result<()>) -> Result<Config> {
        let mut stored = self
            .config
            .lock()
            .map_err(|_| Error::Other("config lock poisoned".to_string()))?;
        let mut next = stored.clone();
        change(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }
}
