use std::{
    fmt::Write as _,
    io::{self, ErrorKind, Write as _},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use super::{Store, StoreError};
use crate::cache::keys::StoreKey;

const BACKEND: &str = "filesystem";

/// One JSON file per key inside a single directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates the directory when missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                backend: BACKEND,
                key: root.display().to_string(),
                source,
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(&key.to_string())))
    }
}

/// Keys may carry caller-supplied filters; anything outside a conservative
/// alphabet is hex-escaped so a key always names a file directly under root.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}

/// Writes `contents` to `target` through a uniquely named staging file in
/// `dir`, so concurrent writers of one target never share a staging path and
/// the last rename wins.
pub(crate) async fn write_atomically(dir: &Path, target: &Path, contents: Bytes) -> io::Result<()> {
    let dir = dir.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&dir)?;
        staging.write_all(&contents)?;
        staging.flush()?;
        staging.persist(&target).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(io::Error::other)?
}

#[async_trait]
impl Store for FsStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StoreError> {
        match fs::read(self.path_for(key)).await {
            Ok(contents) => Ok(Some(Bytes::from(contents))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                backend: BACKEND,
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let bytes = value.len();
        write_atomically(&self.root, &path, value)
            .await
            .map_err(|source| StoreError::Io {
                backend: BACKEND,
                key: key.to_string(),
                source,
            })?;
        debug!(
            target = "quaderno::cache::store",
            backend = BACKEND,
            path = %path.display(),
            bytes,
            "Wrote cache file"
        );
        Ok(())
    }
}
