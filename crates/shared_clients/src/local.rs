use crate::{ObjectStore, ObjectStoreError};
use common::types::S3Path;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Mirrors `s3://bucket/key` to `<root>/bucket/key` on the local disk.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, dest: &S3Path) -> PathBuf {
        self.root.join(&dest.bucket).join(&dest.key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for LocalObjectStore {
    fn put_bytes(&mut self, bytes: &[u8], dest: &S3Path) -> Result<(), ObjectStoreError> {
        if dest.is_directory {
            return Err(ObjectStoreError::rejected(format!(
                "cannot write bytes to directory {dest}"
            )));
        }
        let path = self.path_for(dest);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn exists(&self, dest: &S3Path) -> Result<bool, ObjectStoreError> {
        Ok(self.path_for(dest).exists())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-process store keyed by URI; `fail_next` injects transient failures.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    pub objects: BTreeMap<String, Vec<u8>>,
    pub fail_next: u32,
    pub attempts: u32,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &str) -> Option<&[u8]> {
        self.objects.get(uri).map(Vec::as_slice)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.objects.keys().map(String::as_str).collect()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_bytes(&mut self, bytes: &[u8], dest: &S3Path) -> Result<(), ObjectStoreError> {
        self.attempts += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(ObjectStoreError::transient(format!("throttled writing {dest}")));
        }
        self.objects.insert(dest.uri(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, dest: &S3Path) -> Result<bool, ObjectStoreError> {
        Ok(self.objects.contains_key(&dest.uri()))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
