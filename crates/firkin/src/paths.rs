//! Segment and hint file naming.
//!
//! Everything the engine stores lives next to the caller-supplied base
//! path: segment files are `<base>_<N>` with `N = 0, 1, 2, …` and the
//! directory snapshot is `<base>.hint`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Path of segment `id`: `<base>_<id>`.
pub fn segment_path(base: &Path, id: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{id}"));
    PathBuf::from(name)
}

/// Path of the directory snapshot: `<base>.hint`.
pub fn hint_path(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".hint");
    PathBuf::from(name)
}

/// Lists existing segment files for `base`, sorted ascending by the
/// integer suffix.
///
/// Matching is by parsed suffix, never by lexical file-name order —
/// `<base>_10` must sort after `<base>_9`. Files whose suffix is not a
/// plain decimal number (including the `.hint` snapshot) are ignored.
pub fn discover_segments(base: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let parent = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = base
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid base path"))?;
    let prefix = format!("{file_name}_");

    let mut found = Vec::new();
    for dir_entry in fs::read_dir(parent)? {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(id) = suffix.parse::<u32>() else { continue };
        found.push((id, dir_entry.path()));
    }
    found.sort_by_key(|(id, _)| *id);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn segment_and_hint_names() {
        let base = Path::new("/data/db");
        assert_eq!(segment_path(base, 0), PathBuf::from("/data/db_0"));
        assert_eq!(segment_path(base, 12), PathBuf::from("/data/db_12"));
        assert_eq!(hint_path(base), PathBuf::from("/data/db.hint"));
    }

    #[test]
    fn discover_sorts_by_integer_suffix() {
        let dir = tempdir().unwrap();
        for id in [10u32, 2, 0, 9, 1] {
            std::fs::write(dir.path().join(format!("db_{id}")), b"").unwrap();
        }

        let base = dir.path().join("db");
        let found = discover_segments(&base).unwrap();
        let ids: Vec<u32> = found.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1, 2, 9, 10]);
    }

    #[test]
    fn discover_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("db_0"), b"").unwrap();
        std::fs::write(dir.path().join("db.hint"), b"").unwrap();
        std::fs::write(dir.path().join("db_tmp"), b"").unwrap();
        std::fs::write(dir.path().join("db_1x"), b"").unwrap();
        std::fs::write(dir.path().join("other_3"), b"").unwrap();
        std::fs::write(dir.path().join("db_"), b"").unwrap();

        let found = discover_segments(&dir.path().join("db")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 0);
    }

    #[test]
    fn discover_in_empty_directory() {
        let dir = tempdir().unwrap();
        let found = discover_segments(&dir.path().join("db")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn discover_with_relative_base() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("db_0"), b"").unwrap();

        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let found = discover_segments(Path::new("db"));
        std::env::set_current_dir(cwd).unwrap();

        assert_eq!(found.unwrap().len(), 1);
    }
}
