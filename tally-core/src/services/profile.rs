//! Profile service - saved mapper profiles

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, MapperProfile};
use crate::ports::ConfigStore;

/// Outcome of importing profiles from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileImportSummary {
    pub imported: Vec<String>,
    /// Names that already existed
    pub skipped: Vec<String>,
    /// Names that failed validation
    pub invalid: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfilePayload {
    Many(Vec<MapperProfile>),
    One(Box<MapperProfile>),
}

/// Profile service for mapper profile management
pub struct ProfileService {
    store: Arc<dyn ConfigStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// All profiles, ordered by name
    pub fn list(&self) -> Result<Vec<MapperProfile>> {
        let config = self.store.load()?;
        Ok(config.profiles.into_values().collect())
    }

    pub fn get(&self, name: &str) -> Result<MapperProfile> {
        let config = self.store.load()?;
        config
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Profile '{}'", name)).into())
    }

    /// Validate and store `profile`, replacing any profile of the same name
    pub fn save(&self, profile: MapperProfile) -> Result<MapperProfile> {
        profile.validate()?;
        let name = profile.name.clone();
        let mut pending = Some(profile);
        self.store.update(&mut |config| {
            if let Some(profile) = pending.take() {
                config.profiles.insert(profile.name.clone(), profile);
            }
            Ok(())
        })?;
        tracing::info!(profile = %name, "Saved profile");
        self.get(&name)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.store.update(&mut |config| {
            config
                .profiles
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Error::not_found(format!("Profile '{}'", name)))
        })?;
        tracing::info!(profile = %name, "Removed profile");
        Ok(())
    }

    /// Every profile as a pretty-printed JSON array
    pub fn export_all(&self) -> Result<String> {
        let profiles = self.list()?;
        serde_json::to_string_pretty(&profiles).context("Failed to serialize profiles")
    }

    /// Import profiles from a JSON object or array
    ///
    /// Existing names are never overwritten. Profiles that fail validation
    /// are reported and left out.
    pub fn import_profiles(&self, json: &str) -> Result<ProfileImportSummary> {
        let payload: ProfilePayload =
            serde_json::from_str(json).context("Profile file is not a profile or list of profiles")?;
        let incoming = match payload {
            ProfilePayload::Many(profiles) => profiles,
            ProfilePayload::One(profile) => vec![*profile],
        };

        let mut summary = ProfileImportSummary::default();
        self.store.update(&mut |config| {
            summary = ProfileImportSummary::default();
            for profile in &incoming {
                if config.profiles.contains_key(&profile.name) {
                    summary.skipped.push(profile.name.clone());
                } else if let Err(e) = profile.validate() {
                    tracing::warn!(profile = %profile.name, error = %e, "Skipping invalid profile");
                    summary.invalid.push(profile.name.clone());
                } else {
                    config.profiles.insert(profile.name.clone(), profile.clone());
                    summary.imported.push(profile.name.clone());
                }
            }
            Ok(())
        })?;

        tracing::info!(
            imported = summary.imported.len(),
            skipped = summary.skipped.len(),
            invalid = summary.invalid.len(),
            "Imported profiles"
        );
        Ok(summary)
    }

    /// Add `keys` as unassigned account strings of profile `name`
    ///
    /// Runs as one locked read-modify-write: keys already present, assigned
    /// or not, are left alone. Returns the keys that were added.
    pub fn merge_account_keys(&self, name: &str, keys: &[String]) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut added = Vec::new();
        self.store.update(&mut |config| {
            let profile = config
                .profiles
                .get_mut(name)
                .ok_or_else(|| Error::not_found(format!("Profile '{}'", name)))?;
            let (merged, new_keys) = profile.column_mapping.with_pending_accounts(keys);
            profile.column_mapping = merged;
            added = new_keys;
            Ok(())
        })?;

        if !added.is_empty() {
            tracing::info!(profile = %name, added = added.len(), "Added account keys");
        }
        Ok(added)
    }

    /// Route raw account string `raw` of profile `name` to `target`
    pub fn assign_account(&self, name: &str, raw: &str, target: &str) -> Result<MapperProfile> {
        let mut updated = None;
        self.store.update(&mut |config| {
            let profile = config
                .profiles
                .get_mut(name)
                .ok_or_else(|| Error::not_found(format!("Profile '{}'", name)))?;
            profile.column_mapping = profile
                .column_mapping
                .to_builder()
                .assign_account(raw, target.trim())
                .build();
            updated = Some(profile.clone());
            Ok(())
        })?;
        updated.ok_or_else(|| Error::not_found(format!("Profile '{}'", name)).into())
    }
}
