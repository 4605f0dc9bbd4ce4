//! Persistent embedding gallery.
//!
//! Records live in a single postcard-encoded file. Inserts are serialized
//! on a mutex and committed with a write-to-temp-then-rename, so a reader
//! never observes a partially written gallery. `scan_all` reads whatever
//! is committed at that instant; a concurrent insert may or may not be
//! visible (read-committed, not serializable).

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

const GALLERY_FILE: &str = "gallery.bin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: u64,
    pub name: String,
    pub embedding: Vec<f32>,
    /// Unix seconds at insertion. Informational only, never used in matching.
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Gallery {
    next_id: u64,
    records: Vec<IdentityRecord>,
}

impl Default for Gallery {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("gallery io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gallery encoding: {0}")]
    Codec(#[from] postcard::Error),
    #[error("embedding dimension {got} does not match gallery dimension {expected}")]
    Dimension { expected: usize, got: usize },
}

/// Handle to the on-disk gallery. Cheap to share by reference; all writes
/// go through one lock per handle.
pub struct Store {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Store {
    /// Opens the gallery at `dir`, creating the directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn file(&self) -> PathBuf {
        self.dir.join(GALLERY_FILE)
    }

    fn load(&self) -> Result<Gallery, StoreError> {
        let file = self.file();
        if !file.exists() {
            return Ok(Gallery::default());
        }
        let data = fs::read(&file).map_err(|source| StoreError::Io { path: file, source })?;
        Ok(postcard::from_bytes(&data)?)
    }

    fn commit(&self, gallery: &Gallery) -> Result<(), StoreError> {
        let data = postcard::to_allocvec(gallery)?;
        let tmp = self.dir.join("gallery.bin.tmp");
        let result = (|| {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&data)?;
            f.sync_all()?;
            fs::rename(&tmp, self.file())
        })();
        result.map_err(|source| StoreError::Io {
            path: self.file(),
            source,
        })
    }

    /// Appends a record and returns its id. Duplicate names are allowed;
    /// the record is durably committed before this returns. Ids are
    /// monotonic and survive reopening the store.
    pub fn insert(
        &self,
        name: &str,
        embedding: Vec<f32>,
        created_at: u64,
    ) -> Result<u64, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut gallery = self.load()?;
        if let Some(first) = gallery.records.first() {
            if first.embedding.len() != embedding.len() {
                return Err(StoreError::Dimension {
                    expected: first.embedding.len(),
                    got: embedding.len(),
                });
            }
        }
        let id = gallery.next_id;
        gallery.next_id += 1;
        gallery.records.push(IdentityRecord {
            id,
            name: name.to_owned(),
            embedding,
            created_at,
        });
        self.commit(&gallery)?;
        Ok(id)
    }

    /// Every committed record, in insertion order. The order is a tie-break
    /// convenience for the matcher, not a correctness contract.
    pub fn scan_all(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        Ok(self.load()?.records)
    }

    /// Administrative wipe of the whole gallery, id counter included.
    pub fn purge(&self) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = self.file();
        if file.exists() {
            fs::remove_file(&file).map_err(|source| StoreError::Io { path: file, source })?;
        }
        Ok(())
    }
}
