//! Advisory lock on the snapshot directory (fs2, `<snapshot_dir>/snapstore.lock`).
//!
//! Writers (write, prune) hold it exclusively; readers (read, list, inspect) share it.
//! Released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

pub const LOCK_FILE: &str = "snapstore.lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

pub struct DirLock {
    file: File,
}

impl DirLock {
    /// Block until the shared lock is held.
    pub fn shared(dir: &Path) -> Result<Self> {
        Self::acquire(dir, LockMode::Shared)
    }

    /// Block until the exclusive lock is held.
    pub fn exclusive(dir: &Path) -> Result<Self> {
        Self::acquire(dir, LockMode::Exclusive)
    }

    fn acquire(dir: &Path, mode: LockMode) -> Result<Self> {
        let file = open_lock_file(dir)?;
        match mode {
            LockMode::Shared => file.lock_shared(),
            LockMode::Exclusive => file.lock_exclusive(),
        }
        .with_context(|| format!("lock {:?} in {}", mode, dir.display()))?;
        Ok(Self { file })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(dir: &Path) -> Result<File> {
    let path = dir.join(LOCK_FILE);
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> std::path::PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("svlock-{tag}-{}-{t}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn readers_keep_writers_out() {
        let dir = scratch("rw");
        let r1 = DirLock::shared(&dir).unwrap();
        let r2 = DirLock::shared(&dir).unwrap();

        let contender = open_lock_file(&dir).unwrap();
        assert!(contender.try_lock_exclusive().is_err());

        drop(r1);
        drop(r2);
        contender.try_lock_exclusive().expect("free after readers left");
        contender.unlock().unwrap();

        let w = DirLock::exclusive(&dir).unwrap();
        let other = open_lock_file(&dir).unwrap();
        assert!(other.try_lock_shared().is_err());
        drop(w);
        other.try_lock_shared().expect("free after writer left");
        std::fs::remove_dir_all(&dir).ok();
    }
}
