//! Content-addressed revision tracking.
//!
//! Each idempotency key owns an append-only sequence of payload hashes. A put
//! compares the new hash against the *last* entry only, so re-observing an
//! earlier payload after a change is recorded as a new revision.
//!
//! The hash is SHA-256 over canonical JSON (object keys sorted recursively,
//! compact separators, non-ASCII left unescaped), hex-encoded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{IngestError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PutStatus {
    Inserted,
    Noop,
    Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PutResult {
    pub status: PutStatus,
    pub revision_number: usize,
}

impl PutResult {
    /// Decide the outcome of recording `hash` after a history of `len`
    /// entries ending in `last`.
    ///
    /// Returns the result and whether the hash must be appended. Backends call
    /// this while holding their per-key lock.
    pub fn decide(len: usize, last: Option<&str>, hash: &str) -> (PutResult, bool) {
        match last {
            None => (
                PutResult {
                    status: PutStatus::Inserted,
                    revision_number: 1,
                },
                true,
            ),
            Some(last) if last == hash => (
                PutResult {
                    status: PutStatus::Noop,
                    revision_number: len,
                },
                false,
            ),
            Some(_) => (
                PutResult {
                    status: PutStatus::Revision,
                    revision_number: len + 1,
                },
                true,
            ),
        }
    }
}

/// Storage for per-key hash sequences.
///
/// `append_if_changed` must be atomic with respect to other calls for the same
/// key: two concurrent puts of the same new hash may not both append.
pub trait RevisionBackend: Send + Sync {
    fn append_if_changed(&self, key: &str, hash: &str) -> Result<PutResult, StoreError>;

    fn history(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

impl<B: RevisionBackend + ?Sized> RevisionBackend for Arc<B> {
    fn append_if_changed(&self, key: &str, hash: &str) -> Result<PutResult, StoreError> {
        (**self).append_if_changed(key, hash)
    }

    fn history(&self, key: &str) -> Result<Vec<String>, StoreError> {
        (**self).history(key)
    }
}

/// Process-lifetime backend with one lock per idempotency key.
#[derive(Debug, Default)]
pub struct MemoryRevisionBackend {
    keys: Mutex<HashMap<String, Arc<Mutex<Vec<String>>>>>,
}

impl MemoryRevisionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Result<Arc<Mutex<Vec<String>>>, StoreError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| StoreError::Poisoned("revision index"))?;
        Ok(Arc::clone(keys.entry(key.to_string()).or_default()))
    }
}

impl RevisionBackend for MemoryRevisionBackend {
    fn append_if_changed(&self, key: &str, hash: &str) -> Result<PutResult, StoreError> {
        let slot = self.slot(key)?;
        let mut hashes = slot
            .lock()
            .map_err(|_| StoreError::Poisoned("revision key"))?;
        let (result, append) = PutResult::decide(hashes.len(), hashes.last().map(String::as_str), hash);
        if append {
            hashes.push(hash.to_string());
        }
        Ok(result)
    }

    fn history(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| StoreError::Poisoned("revision index"))?;
        match keys.get(key) {
            Some(slot) => Ok(slot
                .lock()
                .map_err(|_| StoreError::Poisoned("revision key"))?
                .clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// Revision store facade over an injectable backend.
pub struct RevisionStore {
    backend: Box<dyn RevisionBackend>,
}

impl RevisionStore {
    pub fn new(backend: Box<dyn RevisionBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryRevisionBackend::new()))
    }

    /// Record `payload` under `idempotency_key`.
    ///
    /// Serialization happens before the backend is touched, so a payload that
    /// cannot be hashed never leaves a trace in the history.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        idempotency_key: &str,
        payload: &T,
    ) -> Result<PutResult, IngestError> {
        let hash = payload_hash(payload)?;
        Ok(self.backend.append_if_changed(idempotency_key, &hash)?)
    }

    pub fn history(&self, idempotency_key: &str) -> Result<Vec<String>, StoreError> {
        self.backend.history(idempotency_key)
    }
}

impl std::fmt::Debug for RevisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionStore").finish_non_exhaustive()
    }
}

/// Hex SHA-256 of the canonical JSON encoding of `payload`.
pub fn payload_hash<T: Serialize + ?Sized>(payload: &T) -> Result<String, IngestError> {
    let value = serde_json::to_value(payload).map_err(IngestError::Serialization)?;
    let mut encoded = String::new();
    write_canonical(&value, &mut encoded);
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                // Keys are plain strings; serde_json quotes and escapes them.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
