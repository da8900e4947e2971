//! Lexical containment checks for names resolved under a managed directory.

use std::path::{Component, Path, PathBuf};

/// Join a single file name onto `root`, returning `None` if the result would
/// not stay lexically inside `root`.
///
/// Only bare file names are accepted: separators, `.`/`..` components, NUL
/// bytes and absolute paths are all rejected.
pub fn resolve_within(root: &Path, file_name: &str) -> Option<PathBuf> {
    if file_name.is_empty() || file_name.contains(['/', '\\', '\0']) {
        return None;
    }

    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return None,
    }

    let root = normalize(root);
    let resolved = normalize(&root.join(file_name));
    if resolved != root && resolved.starts_with(&root) {
        Some(resolved)
    } else {
        None
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
