//! Config store port - settings persistence abstraction

use crate::config::Config;
use crate::domain::Result;

/// Where profiles, rules and categories are persisted
///
/// Every change goes through [`update`](ConfigStore::update), which must
/// run read-modify-write as one exclusive step so that two processes merging
/// into the same profile cannot lose each other's additions.
pub trait ConfigStore: Send + Sync {
    /// Current configuration
    fn load(&self) -> Result<Config>;

    /// Apply `change` to the stored configuration and persist the result
    ///
    /// Nothing is written when `change` returns an error. Returns the
    /// configuration as saved.
    fn update(&self, change: &mut dyn FnMut(&mut Config) -> Result<()>) -> Result<Config>;
}
