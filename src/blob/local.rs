//! Local directory blob store
//!
//! Each blob is one file under the root directory. Names containing `/` map
//! to subdirectories, so `{store}/{file}` names group a store's snapshots in
//! a directory of their own.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use crate::error::{RangeKvError, Result};

use super::BlobStore;

/// Suffix of in-flight writes; never reported by `list`
const TEMP_SUFFIX: &str = ".tmp";

/// Directory-backed blob store
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open or create a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a blob name to a path under the root, rejecting names that would
    /// escape it
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(RangeKvError::Blob(format!("invalid blob name: {:?}", name)));
        }
        Ok(self.root.join(relative))
    }

    fn collect_names(&self, dir: &Path, names: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_names(&path, names)?;
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !name.ends_with(TEMP_SUFFIX) {
                names.push(name);
            }
        }
        Ok(())
    }
}

impl BlobStore for LocalBlobStore {
    fn get(&self, name: &str) -> Result<Bytes> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RangeKvError::BlobNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temporary sibling, syncs it, then renames over the target
    /// so readers never observe a half-written blob.
    fn put(&self, name: &str, content: Bytes) -> Result<()> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut temp = path.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp)?;
        file.write_all(&content)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RangeKvError::BlobNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect_names(&self.root, &mut names)?;
        names.retain(|name| name.starts_with(prefix));
        names.sort();
        Ok(names)
    }
}
