//! Lexical path helpers
//!
//! Policies never touch the filesystem to decide, so paths are resolved
//! purely by their components: `.` is dropped, `..` pops, and relative
//! paths are anchored at a base directory chosen once at construction.
//! Symlinks are not followed.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` to an absolute, normalized path, anchoring relative
/// paths at `base`
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    normalize(&joined)
}

/// Normalize `.` and `..` components without consulting the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Final path component as UTF-8, if any
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Lowercase extension with its leading dot (`"src/App.TSX"` -> `".tsx"`)
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Lowercase an extension and give it a leading dot (`"TS"` -> `".ts"`)
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("rs"), ".rs");
        assert_eq!(normalize_extension(" .TSX"), ".tsx");
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let resolved = resolve(Path::new("/project"), Path::new("src/../out.ts"));
        assert_eq!(resolved, PathBuf::from("/project/out.ts"));
    }

    #[test]
    fn test_resolve_absolute_ignores_base() {
        let resolved = resolve(Path::new("/project"), Path::new("/tmp/./x.ts"));
        assert_eq!(resolved, PathBuf::from("/tmp/x.ts"));
    }

    #[test]
    fn test_normalize_does_not_escape_root() {
        assert_eq!(normalize(Path::new("/../../etc/passwd")), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension(Path::new("src/App.TSX")).as_deref(), Some(".tsx"));
        assert_eq!(extension(Path::new("Makefile")), None);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/project/src/.env")), Some(".env"));
        assert_eq!(base_name(Path::new("/")), None);
    }
}
