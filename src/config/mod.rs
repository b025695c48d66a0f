//! Profiles, the persistent profile book, and runtime settings
//!
//! The pipeline only ever sees an immutable [`Profile`] snapshot. Writes go
//! through [`ProfileBook`] and [`save_profiles`], driven by the CLI.

mod book;
mod profile;
mod settings;
mod storage;

pub use book::{EnvironmentField, ProfileBook};
pub use profile::{Environments, PRESET_IDS, Profile, preset};
pub use settings::{
    Backend, DEFAULT_API_URL, DEFAULT_LOG_LIMIT, DEFAULT_REST_DELAY, Settings,
};
pub use storage::{load_profiles, profiles_path, save_profiles};
