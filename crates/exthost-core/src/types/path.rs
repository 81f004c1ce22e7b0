//! Lexical path handling shared by module loaders and the app bundler.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path so that `a/./b` and `a/c/../b` compare equal.
///
/// Does not touch the filesystem. `..` never climbs above a root; leading
/// `..` components of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
