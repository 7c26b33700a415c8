use std::path::{Component, Path};

/// Directory names (lowercased) that hold trash or OS bookkeeping and are never walked.
/// Matched on every platform so a mounted foreign volume is handled too.
const RESERVED_DIR_NAMES: &[&str] = &[
    // Windows
    "$recycle.bin",
    "recycler",
    "recycled",
    "system volume information",
    "$windows.~bt",
    "$windows.~ws",
    "$sysreset",
    "config.msi",
    // macOS
    ".trash",
    ".trashes",
    ".spotlight-v100",
    ".fseventsd",
    ".documentrevisions-v100",
    ".temporaryitems",
    // Linux
    "lost+found",
];

/// Reserved name prefixes, e.g. `.Trash-1000` on removable Linux media.
const RESERVED_DIR_PREFIXES: &[&str] = &[".trash-"];

/// Multi-component fragments, compared component-wise and case-insensitively.
const RESERVED_PATH_FRAGMENTS: &[&[&str]] = &[&[".local", "share", "trash"]];

pub fn is_reserved_dir_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_DIR_NAMES.contains(&lower.as_str())
        || RESERVED_DIR_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}

/// True when any component of `path` is a reserved directory or the path
/// passes through one of the reserved fragments.
pub fn is_reserved_path(path: &Path) -> bool {
    let names: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect();

    if names.iter().any(|name| is_reserved_dir_name(name)) {
        return true;
    }

    RESERVED_PATH_FRAGMENTS.iter().any(|fragment| {
        names
            .windows(fragment.len())
            .any(|window| window.iter().zip(fragment.iter()).all(|(a, b)| a == b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_reserved_names_case_insensitive() {
        assert!(is_reserved_dir_name("$RECYCLE.BIN"));
        assert!(is_reserved_dir_name("System Volume Information"));
        assert!(is_reserved_dir_name(".Trashes"));
        assert!(is_reserved_dir_name(".Trash-1000"));
        assert!(!is_reserved_dir_name("Documents"));
        assert!(!is_reserved_dir_name("trash_talk"));
    }

    #[test]
    fn test_reserved_fragment() {
        let path = PathBuf::from("/home/me/.local/share/Trash/files/a.txt");
        assert!(is_reserved_path(&path));
        assert!(!is_reserved_path(Path::new("/home/me/.local/share/docs/a.txt")));
    }
}
