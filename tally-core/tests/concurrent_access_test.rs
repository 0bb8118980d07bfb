//! Concurrent settings access tests
//!
//! Several stores, each with its own handle on the same settings.json,
//! merge account keys into one profile at the same time. Every key must
//! survive; the fs2 lock serializes the read-modify-write cycles.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use tally_core::adapters::FileConfigStore;
use tally_core::services::ProfileService;
use tally_core::{ColumnMapping, Config, MapperProfile};

/// Number of concurrent writers
const THREAD_COUNT: usize = 6;

/// Keys merged per writer
const KEYS_PER_THREAD: usize = 5;

fn multi_account_profile() -> MapperProfile {
    MapperProfile::new(
        "Shared",
        ColumnMapping::builder()
            .date("Date")
            .description("Memo")
            .amount("Amount")
            .account("Account")
            .build(),
    )
}

#[test]
fn test_concurrent_key_merges_are_not_lost() {
    let dir = TempDir::new().unwrap();
    ProfileService::new(Arc::new(FileConfigStore::new(dir.path())))
        .save(multi_account_profile())
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let barrier = Arc::clone(&barrier);
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                // separate store per thread, like separate processes
                let service = ProfileService::new(Arc::new(FileConfigStore::new(&path)));
                barrier.wait();
                for k in 0..KEYS_PER_THREAD {
                    service
                        .merge_account_keys("Shared", &[format!("T{}-K{}", t, k)])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer panicked");
    }

    let config = Config::load(dir.path()).unwrap();
    let profile = &config.profiles["Shared"];
    assert_eq!(
        profile.column_mapping.account_mapping.len(),
        THREAD_COUNT * KEYS_PER_THREAD
    );
}

#[test]
fn test_concurrent_merges_keep_assignments() {
    let dir = TempDir::new().unwrap();
    let service = ProfileService::new(Arc::new(FileConfigStore::new(dir.path())));
    service.save(multi_account_profile()).unwrap();
    service.assign_account("Shared", "MAIN", "checking").unwrap();

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                let service = ProfileService::new(Arc::new(FileConfigStore::new(&path)));
                // every writer also sees MAIN again
                service
                    .merge_account_keys("Shared", &["MAIN".to_string(), format!("NEW{}", t)])
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer panicked");
    }

    let profile = service.get("Shared").unwrap();
    assert_eq!(profile.column_mapping.resolve_account("MAIN"), Some("checking"));
    assert_eq!(profile.column_mapping.pending_accounts().len(), THREAD_COUNT);
}
