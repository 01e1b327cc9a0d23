//! [`ConfigStore`]: load and atomically replace the output list.

use crate::error::{Result, StoreError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handle to the output list file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for `path`. Nothing is touched until `load` or `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the list file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current list. A missing file is an empty list; blank lines
    /// are skipped.
    pub fn load(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No existing list");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Replace the list with `entries`, in order.
    ///
    /// On error the previous file, if any, is left untouched and the
    /// temporary file is removed.
    pub fn save(&self, entries: &[String]) -> Result<()> {
        let dir = self.directory();
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(render(entries).as_bytes())
            .map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        tracing::info!(
            path = %self.path.display(),
            count = entries.len(),
            "Saved working configurations"
        );
        Ok(())
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// File contents for `entries`: one per line, trailing newline when
/// non-empty.
#[must_use]
pub fn render(entries: &[String]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = entries.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("configs.txt"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("out").join("configs.txt"));
        let list = entries(&["vless://a@h:1", "trojan://b@h:2"]);

        store.save(&list).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read");
        assert_eq!(raw, "vless://a@h:1\ntrojan://b@h:2\n");
        assert_eq!(store.load().expect("load"), list);
    }

    #[test]
    fn test_save_empty_list_writes_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("configs.txt"));
        store.save(&entries(&["vless://a@h:1"])).expect("save");

        store.save(&[]).expect("save empty");
        assert_eq!(fs::read_to_string(store.path()).expect("read"), "");
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("configs.txt");
        fs::write(&path, "vless://a@h:1\n\n  \r\ntrojan://b@h:2").expect("write");

        let store = ConfigStore::new(path);
        assert_eq!(
            store.load().expect("load"),
            entries(&["vless://a@h:1", "trojan://b@h:2"])
        );
    }

    #[test]
    fn test_abandoned_temp_file_leaves_list_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("configs.txt"));
        store.save(&entries(&["vless://old@h:1"])).expect("save");

        // A writer that dies before the rename leaves only its temp file.
        let mut partial = NamedTempFile::new_in(dir.path()).expect("temp");
        partial.write_all(b"vless://half").expect("write");
        let (_file, _path) = partial.keep().expect("keep temp file");

        assert_eq!(store.load().expect("load"), entries(&["vless://old@h:1"]));
    }

    #[test]
    fn test_failed_save_keeps_previous_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The target is a non-empty directory, so the final rename fails.
        let target = dir.path().join("configs.txt");
        fs::create_dir(&target).expect("mkdir");
        fs::write(target.join("keep"), "previous").expect("write");

        let store = ConfigStore::new(&target);
        let err = store.save(&entries(&["vless://new@h:1"])).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));

        assert_eq!(
            fs::read_to_string(target.join("keep")).expect("read"),
            "previous"
        );
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path() != target)
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn test_parent_that_is_a_file_fails_to_create() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("write");

        let store = ConfigStore::new(blocker.join("configs.txt"));
        let err = store.save(&entries(&["vless://a@h:1"])).unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&[]), "");
        assert_eq!(render(&entries(&["a"])), "a\n");
    }
}
