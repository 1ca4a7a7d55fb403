use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::core::{Error, Result};
use crate::storage::KeyValueStore;

const SNAPSHOT_EXT: &str = "tss";
const TEMP_EXT: &str = "tss.tmp";

#[derive(Clone, Copy, Debug)]
pub struct FileStoreConfig {
    /// fsync the snapshot file before the rename and the directory after it.
    pub sync: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self { sync: true }
    }
}

/// One snapshot file per key under a root directory.
///
/// Keys are percent-encoded into file names: bytes outside `[A-Za-z0-9_.-]`,
/// and a leading `.`, become `%XX`. Any non-empty key maps to a distinct file
/// directly under the root.
///
/// Writes go to `<key>.tss.tmp` and are renamed over `<key>.tss`, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    config: FileStoreConfig,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// - `Error::Io`: Failed to create the root directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(root, FileStoreConfig::default())
    }

    pub fn open_with_config(root: impl AsRef<Path>, config: FileStoreConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file backing `key`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidKey`: Key is empty
    pub fn snapshot_path(&self, key: &str) -> Result<PathBuf> {
        let stem = file_stem(key)?;
        Ok(self.root.join(format!("{stem}.{SNAPSHOT_EXT}")))
    }

    fn temp_path(&self, key: &str) -> Result<PathBuf> {
        let stem = file_stem(key)?;
        Ok(self.root.join(format!("{stem}.{TEMP_EXT}")))
    }

    fn sync_root(&self) -> Result<()> {
        // Directory fsync is not supported on every platform.
        #[cfg(unix)]
        File::open(&self.root)?.sync_all()?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.snapshot_path(key)?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Io(err)),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.snapshot_path(key)?;
        let tmp = self.temp_path(key)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(value)?;
        if self.config.sync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, &path)?;
        if self.config.sync {
            self.sync_root()?;
        }
        Ok(())
    }
}

fn file_stem(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(Error::InvalidKey(key.to_string()));
    }
    let mut stem = String::with_capacity(key.len());
    for (i, b) in key.bytes().enumerate() {
        let plain =
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-') || (b == b'.' && i > 0);
        if plain {
            stem.push(char::from(b));
        } else {
            stem.push_str(&format!("%{b:02X}"));
        }
    }
    Ok(stem)
}
