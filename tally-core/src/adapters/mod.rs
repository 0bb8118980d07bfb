//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - settings.json on the local filesystem for ConfigStore
//! - an in-memory ConfigStore for tests and embedding

pub mod file_store;
pub mod memory_store;

pub use file_store::FileConfigStore;
pub use memory_store::MemoryConfigStore;
