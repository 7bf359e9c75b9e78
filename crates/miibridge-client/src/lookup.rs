use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miibridge_wire::StoreData;
use tracing::debug;

use crate::error::{RenderError, Result};

/// Resolves an external account identifier to a stored avatar descriptor.
pub trait DescriptorLookup: Send + Sync {
    fn lookup(&self, account_id: &str) -> Result<StoreData>;
}

/// Canonical account key: lower-case with `-`, `_` and `.` removed.
pub fn normalize_account_id(account_id: &str) -> String {
    account_id
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// In-memory table, keyed by normalized account id.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    entries: HashMap<String, StoreData>,
}

impl MemoryLookup {
    /// Empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under the normalized form of `account_id`.
    pub fn insert(&mut self, account_id: &str, data: StoreData) {
        self.entries.insert(normalize_account_id(account_id), data);
    }

    /// Number of stored descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no descriptor is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DescriptorLookup for MemoryLookup {
    fn lookup(&self, account_id: &str) -> Result<StoreData> {
        self.entries
            .get(&normalize_account_id(account_id))
            .cloned()
            .ok_or_else(|| RenderError::LookupNotFound(account_id.to_string()))
    }
}

/// One `<normalized id>.bin` file per account under a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    root: PathBuf,
}

impl DirectoryLookup {
    /// Lookup reading `<root>/<normalized id>.bin`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory descriptors are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(self.root.join(format!("{key}.bin")))
    }
}

impl DescriptorLookup for DirectoryLookup {
    fn lookup(&self, account_id: &str) -> Result<StoreData> {
        let not_found = || RenderError::LookupNotFound(account_id.to_string());
        let path = self
            .path_for(&normalize_account_id(account_id))
            .ok_or_else(not_found)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(RenderError::Io(err)),
        };
        debug!(path = %path.display(), "loaded stored descriptor");
        Ok(StoreData::from_slice(&bytes)?)
    }
}
