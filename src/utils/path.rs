//! Unicode-tolerant input path resolution.
//!
//! Agents usually send file names in NFC while some filesystems (notably
//! macOS HFS+) store them decomposed. Resolution tries the literal path,
//! then its NFC and NFD forms, then scans the parent directory for an entry
//! whose normalized name matches.

use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

fn nfc(text: &str) -> String {
    text.nfc().collect()
}

fn nfd(text: &str) -> String {
    text.nfd().collect()
}

/// Find an existing path equivalent to `raw` under Unicode normalization
pub fn resolve_unicode_path(raw: &str) -> Option<PathBuf> {
    let literal = PathBuf::from(raw);
    if literal.exists() {
        return Some(literal);
    }

    for candidate in [nfc(raw), nfd(raw)] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            tracing::debug!(
                requested = raw,
                resolved = %path.display(),
                "Resolved input path via Unicode normalization"
            );
            return Some(path);
        }
    }

    scan_parent(&literal)
}

fn scan_parent(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = resolve_dir(&parent)?;
    let wanted = nfc(name);

    let entries = std::fs::read_dir(&parent).ok()?;
    entries
        .filter_map(Result::ok)
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|candidate| nfc(candidate) == wanted)
        })
        .map(|entry| entry.path())
}

fn resolve_dir(dir: &Path) -> Option<PathBuf> {
    if dir.is_dir() {
        return Some(dir.to_path_buf());
    }
    let raw = dir.to_str()?;
    [nfc(raw), nfd(raw)]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOSED: &str = "r\u{e9}sum\u{e9}.pdf";
    const DECOMPOSED: &str = "re\u{301}sume\u{301}.pdf";

    #[test]
    fn test_literal_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        assert_eq!(resolve_unicode_path(path.to_str().unwrap()), Some(path));
    }

    #[test]
    fn test_nfc_request_finds_nfd_file() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join(DECOMPOSED);
        std::fs::write(&on_disk, b"%PDF").unwrap();

        let requested = dir.path().join(COMPOSED);
        let resolved = resolve_unicode_path(requested.to_str().unwrap()).unwrap();
        assert!(resolved.is_file());
        assert_eq!(
            nfc(resolved.file_name().unwrap().to_str().unwrap()),
            COMPOSED
        );
    }

    #[test]
    fn test_nfd_request_finds_nfc_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COMPOSED), b"%PDF").unwrap();

        let requested = dir.path().join(DECOMPOSED);
        let resolved = resolve_unicode_path(requested.to_str().unwrap()).unwrap();
        assert!(resolved.is_file());
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("absent.pdf");
        assert!(resolve_unicode_path(requested.to_str().unwrap()).is_none());
        assert!(resolve_unicode_path("/definitely/not/here.pdf").is_none());
    }
}
