//! The set of saved profiles and which one is active

use super::profile::{PRESET_IDS, Profile, preset};
use crate::error::{Error, Result};
use crate::types::Namespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which field of an environment to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentField {
    /// Root path or URL
    Root,
    /// Display name
    Name,
}

/// Saved profiles plus the active profile id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBook {
    /// Active profile id
    pub active: String,
    /// Profiles by id
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for ProfileBook {
    fn default() -> Self {
        Self::presets()
    }
}

impl ProfileBook {
    /// A book holding the built-in profiles, `default` active
    pub fn presets() -> Self {
        let profiles = PRESET_IDS
            .iter()
            .filter_map(|id| preset(id).map(|p| ((*id).to_string(), p)))
            .collect();
        Self {
            active: "default".to_string(),
            profiles,
        }
    }

    /// The active profile
    ///
    /// Falls back to the first profile when `active` is stale.
    pub fn active_profile(&self) -> Result<&Profile> {
        self.profiles
            .get(&self.active)
            .or_else(|| self.profiles.values().next())
            .ok_or_else(|| Error::Profile("no profiles defined".to_string()))
    }

    /// Look up a profile by id
    pub fn get(&self, id: &str) -> Result<&Profile> {
        self.profiles
            .get(id)
            .ok_or_else(|| Error::Profile(format!("profile '{id}' not found")))
    }

    /// Make `id` the active profile
    pub fn switch(&mut self, id: &str) -> Result<()> {
        self.get(id)?;
        self.active = id.to_string();
        Ok(())
    }

    /// Set one field of one environment, creating the environment if needed
    pub fn update_environment(
        &mut self,
        profile_id: &str,
        namespace: Namespace,
        key: &str,
        field: EnvironmentField,
        value: &str,
    ) -> Result<()> {
        let profile = self
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| Error::Profile(format!("profile '{profile_id}' not found")))?;
        let env = profile
            .environments
            .namespace_mut(namespace)
            .entry(key.to_string())
            .or_default();
        match field {
            EnvironmentField::Root => env.root = value.to_string(),
            EnvironmentField::Name => {
                env.name = (!value.is_empty()).then(|| value.to_string());
            }
        }
        Ok(())
    }

    /// Copy `base_id` into a new profile with blank roots and activate it
    ///
    /// Returns the new profile id.
    pub fn create(&mut self, name: &str, base_id: &str) -> Result<String> {
        let base = self
            .profiles
            .get(base_id)
            .cloned()
            .or_else(|| preset("default"))
            .ok_or_else(|| Error::Profile(format!("base profile '{base_id}' not found")))?;

        let id = uuid::Uuid::new_v4().to_string();
        let mut profile = base.clone();
        profile.id.clone_from(&id);
        profile.name = name.to_string();
        profile.description = format!("Copied from {}", base.name);
        profile.environments.clear_roots();

        self.profiles.insert(id.clone(), profile);
        self.active.clone_from(&id);
        Ok(id)
    }

    /// Delete a profile; the last remaining profile cannot be deleted
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if !self.profiles.contains_key(id) {
            return Err(Error::Profile(format!("profile '{id}' not found")));
        }
        if self.profiles.len() <= 1 {
            return Err(Error::Profile(
                "at least one profile must remain".to_string(),
            ));
        }
        self.profiles.remove(id);
        if self.active == id {
            self.active = self
                .profiles
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| "default".to_string());
        }
        Ok(())
    }

    /// Restore a built-in profile to its shipped state
    pub fn reset(&mut self, id: &str) -> Result<()> {
        let fresh = preset(id).ok_or_else(|| {
            Error::Profile(format!("'{id}' is not a built-in profile and cannot be reset"))
        })?;
        self.profiles.insert(id.to_string(), fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_default_active() {
        let book = ProfileBook::presets();
        assert_eq!(book.profiles.len(), 3);
        assert_eq!(book.active_profile().unwrap().id, "default");
    }

    #[test]
    fn test_create_clears_roots_and_activates() {
        let mut book = ProfileBook::presets();
        book.update_environment("default", Namespace::Local, "release", EnvironmentField::Root, "/wc/release")
            .unwrap();

        let id = book.create("Mine", "default").unwrap();

        assert_eq!(book.active, id);
        let created = book.get(&id).unwrap();
        assert_eq!(created.name, "Mine");
        assert_eq!(created.description, "Copied from International");
        assert!(created.environments.local.values().all(|e| e.root.is_empty()));
        assert_eq!(created.steps, book.get("default").unwrap().steps);
    }

    #[test]
    fn test_delete_last_profile_refused() {
        let mut book = ProfileBook::presets();
        book.delete("japan").unwrap();
        book.delete("china").unwrap();
        assert!(matches!(book.delete("default"), Err(Error::Profile(_))));
    }

    #[test]
    fn test_delete_active_repoints() {
        let mut book = ProfileBook::presets();
        book.switch("japan").unwrap();
        book.delete("japan").unwrap();
        assert_ne!(book.active, "japan");
        assert!(book.profiles.contains_key(&book.active));
    }

    #[test]
    fn test_reset_only_presets() {
        let mut book = ProfileBook::presets();
        let id = book.create("Custom", "default").unwrap();
        assert!(book.reset(&id).is_err());

        book.update_environment("china", Namespace::Remote, "internal", EnvironmentField::Name, "X")
            .unwrap();
        book.reset("china").unwrap();
        assert_eq!(book.get("china").unwrap(), &preset("china").unwrap());
    }

    #[test]
    fn test_update_environment_empty_name_clears() {
        let mut book = ProfileBook::presets();
        book.update_environment("default", Namespace::Remote, "release", EnvironmentField::Name, "")
            .unwrap();
        let env = book
            .get("default")
            .unwrap()
            .environment(Namespace::Remote, "release")
            .unwrap();
        assert_eq!(env.name, None);
        assert_eq!(env.label("release"), "release");
    }
}
