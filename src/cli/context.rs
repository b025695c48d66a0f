//! Shared command context for CLI commands
//!
//! Loads settings and the profile book, and picks the profile a command
//! works on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use svn_cascade::config::{Profile, ProfileBook, Settings, load_profiles, profiles_path, save_profiles};
use svn_cascade::error::Result;
use svn_cascade::svn::{SvnService, create_svn_service};
use tracing::debug;

/// Shared context for CLI commands
pub struct CommandContext {
    /// Runtime settings
    pub settings: Settings,
    /// Where the profile book lives
    pub profiles_path: PathBuf,
    /// The profile book
    pub book: ProfileBook,
    /// Profile selected with `--profile`, if any
    selected: Option<String>,
}

impl CommandContext {
    /// Load settings and profiles
    ///
    /// `config` overrides both the default location and `SVN_CASCADE_CONFIG`.
    pub fn new(settings: Settings, config: Option<&Path>, profile: Option<&str>) -> Result<Self> {
        let profiles_path = profiles_path(config.or(settings.config_path.as_deref()))?;
        debug!(path = %profiles_path.display(), "loading profiles");
        let book = load_profiles(&profiles_path)?;

        let ctx = Self {
            settings,
            profiles_path,
            book,
            selected: profile.map(str::to_string),
        };
        // Fail early on an unknown --profile
        ctx.profile()?;
        Ok(ctx)
    }

    /// The profile commands operate on: `--profile`, else the active one
    pub fn profile(&self) -> Result<&Profile> {
        match &self.selected {
            Some(id) => self.book.get(id),
            None => self.book.active_profile(),
        }
    }

    /// Id of [`Self::profile`]
    pub fn profile_id(&self) -> Result<String> {
        Ok(self.profile()?.id.clone())
    }

    /// svn service selected by the settings
    pub fn svn(&self) -> Result<Arc<dyn SvnService>> {
        create_svn_service(&self.settings)
    }

    /// Write the profile book back
    pub fn save(&self) -> Result<()> {
        save_profiles(&self.profiles_path, &self.book)
    }
}
