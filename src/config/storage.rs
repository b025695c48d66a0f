//! Persistence for the profile book in `<config_dir>/svn-cascade/`.

use super::book::ProfileBook;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name for svn-cascade within the user config directory.
const APP_DIR: &str = "svn-cascade";

/// Filename for the profile book.
const PROFILES_FILE: &str = "profiles.toml";

/// Get the path of the profile book.
///
/// `override_path` wins when set; otherwise the file lives under the
/// platform config directory (`~/.config` on Linux).
pub fn profiles_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(PROFILES_FILE))
        .ok_or_else(|| Error::Config("could not determine the user config directory".to_string()))
}

/// Load the profile book from disk.
///
/// Returns the built-in presets if the file doesn't exist.
pub fn load_profiles(path: &Path) -> Result<ProfileBook> {
    if !path.exists() {
        return Ok(ProfileBook::presets());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let book: ProfileBook = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

    if book.profiles.is_empty() {
        return Err(Error::Config(format!(
            "{} defines no profiles",
            path.display()
        )));
    }

    Ok(book)
}

/// Save the profile book to disk.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_profiles(path: &Path, book: &ProfileBook) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Config(format!("failed to create {}: {e}", dir.display())))?;
    }

    let content = toml::to_string_pretty(book)
        .map_err(|e| Error::Config(format!("failed to serialize profiles: {e}")))?;

    let content_with_header = format!(
        "# svn-cascade profiles\n# Auto-generated - manual edits may be overwritten\n\n{content}"
    );

    fs::write(path, content_with_header)
        .map_err(|e| Error::Config(format!("failed to write {}: {e}", path.display())))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentField;
    use crate::types::Namespace;
    use tempfile::TempDir;

    #[test]
    fn test_profiles_path_override() {
        let path = profiles_path(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_load_missing_file_returns_presets() {
        let temp = TempDir::new().unwrap();
        let book = load_profiles(&temp.path().join("profiles.toml")).unwrap();
        assert_eq!(book, ProfileBook::presets());
    }

    #[test]
    fn test_save_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("profiles.toml");

        save_profiles(&path, &ProfileBook::presets()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip_keeps_edits() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("profiles.toml");

        let mut book = ProfileBook::presets();
        book.update_environment(
            "japan",
            Namespace::Local,
            "release",
            EnvironmentField::Root,
            "/wc/release_jp",
        )
        .unwrap();
        book.switch("japan").unwrap();
        save_profiles(&path, &book).unwrap();

        let loaded = load_profiles(&path).unwrap();
        assert_eq!(loaded.active, "japan");
        let env = loaded
            .get("japan")
            .unwrap()
            .environment(Namespace::Local, "release")
            .unwrap();
        assert_eq!(env.root, "/wc/release_jp");
        assert_eq!(loaded, book);
    }

    #[test]
    fn test_file_contains_header_comment() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("profiles.toml");
        save_profiles(&path, &ProfileBook::presets()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# svn-cascade profiles"));
        assert!(content.contains("Auto-generated"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("profiles.toml");
        fs::write(&path, "active = [").unwrap();

        assert!(matches!(load_profiles(&path), Err(Error::Config(_))));
    }
}
