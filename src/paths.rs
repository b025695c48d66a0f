//! Joining environment roots with directory sub-paths

use std::path::{Path, PathBuf};
use url::Url;

const REPOSITORY_SCHEMES: [&str; 5] = ["svn", "svn+ssh", "http", "https", "file"];

/// Whether `root` is a repository URL rather than a local path
pub fn is_repository_url(root: &str) -> bool {
    Url::parse(root.trim()).is_ok_and(|url| REPOSITORY_SCHEMES.contains(&url.scheme()))
}

fn trim_sub(sub: &str) -> impl Iterator<Item = &str> {
    sub.split(['/', '\\']).filter(|part| !part.is_empty())
}

/// Join a source root (URL or path) with a sub-path, `/`-separated
pub fn source_path(root: &str, sub: &str) -> String {
    let root = root.trim().trim_end_matches(['/', '\\']);
    let root = if is_repository_url(root) {
        root.to_string()
    } else {
        root.replace('\\', "/")
    };

    trim_sub(sub).fold(root, |mut acc, part| {
        acc.push('/');
        acc.push_str(part);
        acc
    })
}

/// Join a working-copy root with a sub-path using the platform separator
///
/// A `file://` prefix on the root is dropped; working copies are local.
/// `file:///C:/wc` becomes `C:/wc`, `file:///wc` becomes `/wc`.
pub fn working_copy_path(root: &str, sub: &str) -> PathBuf {
    let root = root.trim();
    let root = match root.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("file://") => {
            let rest = &root[7..];
            match rest.as_bytes() {
                [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &rest[1..],
                _ => rest,
            }
        }
        _ => root,
    };
    trim_sub(sub).fold(PathBuf::from(root), |acc, part| acc.join(part))
}

/// Display form of a working-copy path for svn arguments
pub fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
