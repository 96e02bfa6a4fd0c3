//! On-disk key-value cache for extracted symbol trees.
//!
//! Records serialise through serde_json (self-describing). Entries live in
//! bucket files named by a hash of the key; each bucket holds `[key, value]`
//! pairs and collisions within a bucket are resolved by linear scan.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures at the cache boundary; callers decide whether to retry or
/// disable the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] io::Error),
    #[error("cache record error: {0}")]
    Record(#[from] serde_json::Error),
}

type Bucket = Vec<(String, serde_json::Value)>;

/// A directory of hashed bucket files.
pub struct SymbolCache {
    dir: PathBuf,
}

impl SymbolCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(SymbolCache { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the value stored under `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let bucket = self.read_bucket(&self.bucket_path(key))?;
        for (stored, value) in bucket {
            if stored == key {
                return Ok(Some(serde_json::from_value(value)?));
            }
        }
        Ok(None)
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let path = self.bucket_path(key);
        let mut bucket = self.read_bucket(&path)?;
        let encoded = serde_json::to_value(value)?;
        match bucket.iter_mut().find(|(stored, _)| stored == key) {
            Some(entry) => entry.1 = encoded,
            None => bucket.push((key.to_string(), encoded)),
        }
        self.write_bucket(&path, &bucket)
    }

    /// Delete the entry under `key`. Returns whether one existed.
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.bucket_path(key);
        let mut bucket = self.read_bucket(&path)?;
        let before = bucket.len();
        bucket.retain(|(stored, _)| stored != key);
        if bucket.len() == before {
            return Ok(false);
        }
        if bucket.is_empty() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_bucket(&path, &bucket)?;
        }
        Ok(true)
    }

    /// Remove every bucket.
    pub fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().map(|e| e == "json").unwrap_or(false) {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn bucket_path(&self, key: &str) -> PathBuf {
        let hex = blake3::hash(key.as_bytes()).to_hex();
        self.dir.join(format!("{}.json", &hex.as_str()[..16]))
    }

    fn read_bucket(&self, path: &Path) -> Result<Bucket, CacheError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_bucket(&self, path: &Path, bucket: &Bucket) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(bucket)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
