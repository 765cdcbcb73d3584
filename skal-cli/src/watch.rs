//! Recompile-on-change support for `skal compile --watch`.
//!
//! The source tree is the directory of the input file. A change is any
//! difference in the names, sizes or modification times of the `.sk`
//! files below it.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub struct Watcher {
    dir: PathBuf,
    last: Option<Vec<u8>>,
}

impl Watcher {
    pub fn new(input: &Path) -> Self {
        let dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Watcher { dir, last: None }
    }

    /// Whether the tree changed since the previous poll. The first poll
    /// always reports a change.
    pub fn poll(&mut self) -> Result<bool> {
        let hash = tree_hash(&self.dir)?;
        if self.last.as_ref() == Some(&hash) {
            return Ok(false);
        }
        self.last = Some(hash);
        Ok(true)
    }

    /// Poll forever, calling `on_change` after each change.
    pub fn run(mut self, mut on_change: impl FnMut() -> Result<()>) -> Result<()> {
        loop {
            if self.poll()? {
                on_change()?;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// SHA-256 over the name, size and modification time of every `.sk` file.
pub fn tree_hash(dir: &Path) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "sk") {
            continue;
        }
        let meta = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();

        let relative = path.strip_prefix(dir).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(meta.len().to_le_bytes());
        hasher.update(modified.as_nanos().to_le_bytes());
    }
    Ok(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn first_poll_reports_a_change() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("main.sk");
        fs::write(&input, "print(1)").expect("write input");

        let mut watcher = Watcher::new(&input);
        assert!(watcher.poll().expect("poll"));
        assert!(!watcher.poll().expect("poll"));
    }

    #[test]
    fn detects_new_and_resized_sources() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("main.sk");
        fs::write(&input, "print(1)").expect("write input");
        let mut watcher = Watcher::new(&input);
        watcher.poll().expect("poll");

        fs::create_dir_all(dir.path().join("lib")).expect("create lib");
        fs::write(dir.path().join("lib/util.sk"), "pub fn u() {}").expect("write util");
        assert!(watcher.poll().expect("poll"));

        fs::write(&input, "print(1)\nprint(2)").expect("rewrite input");
        assert!(watcher.poll().expect("poll"));
    }

    #[test]
    fn ignores_other_files() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("main.sk");
        fs::write(&input, "print(1)").expect("write input");
        let before = tree_hash(dir.path()).expect("hash");

        fs::write(dir.path().join("main.lua"), "print(1)").expect("write output");
        assert_eq!(tree_hash(dir.path()).expect("hash"), before);
    }
}
