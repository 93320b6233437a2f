//! Saving and loading family trees.
//!
//! Storage backends only move text around ([`TreeStorage`]); this module
//! owns the JSON shape. Loading is forgiving: besides the current
//! `{"members": {...}}` layout it accepts a bare id-to-member map and a
//! plain array of members, and anything it cannot make sense of falls back
//! to the sample tree.
//!
//! Ids must be numeric, either as JSON numbers or numeric strings. A member
//! stored under a non-numeric id is kept but given a fresh id, and links that
//! name the old id are dropped as unresolved. Loaded links are repaired so the
//! store is consistent: see [`FamilyStore::from_members`].

use crate::member::{Gender, Member, MemberId};
use crate::sample::sample_store;
use crate::store::FamilyStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid save format")]
    InvalidFormat,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Current save file version.
pub const SAVE_VERSION: u32 = 1;

/// Where a serialized tree lives.
#[async_trait]
pub trait TreeStorage: Send + Sync {
    /// Read the stored text, or `None` if nothing has been saved yet.
    async fn read(&self) -> Result<Option<String>, PersistError>;

    /// Replace the stored text.
    async fn write(&self, contents: &str) -> Result<(), PersistError>;

    /// Human-readable location, for log messages.
    fn describe(&self) -> String;
}

/// A JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TreeStorage for FileStorage {
    async fn read(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contents: &str) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, contents).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-local storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    contents: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing stored text.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.into()))),
            fail_writes: Arc::default(),
        }
    }

    /// The currently stored text.
    pub async fn contents(&self) -> Option<String> {
        self.contents.lock().await.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TreeStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<String>, PersistError> {
        Ok(self.contents.lock().await.clone())
    }

    async fn write(&self, contents: &str) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("writes disabled".to_string()));
        }
        *self.contents.lock().await = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// On-disk layout of a saved tree.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedTree<'a> {
    version: u32,
    saved_at: String,
    members: &'a BTreeMap<MemberId, Member>,
}

/// Serialize a store in the current save format.
pub fn to_json(store: &FamilyStore) -> Result<String, PersistError> {
    let saved = SavedTree {
        version: SAVE_VERSION,
        saved_at: unix_timestamp(),
        members: store.members(),
    };
    Ok(serde_json::to_string_pretty(&saved)?)
}

/// Parse saved text in any supported layout.
pub fn parse_store(text: &str) -> Result<FamilyStore, PersistError> {
    let value: Value = serde_json::from_str(text)?;
    normalize(value).ok_or(PersistError::InvalidFormat)
}

/// Convert a parsed JSON document into a store.
///
/// Accepted layouts:
/// - `{"members": {id: member, ...}}` (or `members` as an array),
/// - `{id: member, ...}`, recognised when the first value has `id` or `name`,
/// - `[member, ...]`, where members without an id get a fresh one.
///
/// Returns `None` for anything else.
pub fn normalize(value: Value) -> Option<FamilyStore> {
    match value {
        Value::Object(mut map) => {
            if let Some(version) = map.get("version").and_then(Value::as_u64) {
                if version > u64::from(SAVE_VERSION) {
                    warn!(version, "Save is newer than this version understands");
                }
            }
            match map.remove("members") {
                Some(Value::Object(entries)) => Some(from_entries(entries)),
                Some(Value::Array(items)) => Some(from_items(items)),
                Some(_) => None,
                None if looks_like_member_map(&map) => Some(from_entries(map)),
                None => None,
            }
        }
        Value::Array(items) => Some(from_items(items)),
        _ => None,
    }
}

/// Load a store, falling back to the sample tree.
pub async fn load_store(storage: &dyn TreeStorage) -> FamilyStore {
    load_store_or(storage, sample_store).await
}

/// Load a store, using `fallback` when nothing usable is stored.
pub async fn load_store_or(
    storage: &dyn TreeStorage,
    fallback: impl FnOnce() -> FamilyStore + Send,
) -> FamilyStore {
    let location = storage.describe();
    let text = match storage.read().await {
        Ok(Some(text)) => text,
        Ok(None) => {
            info!(%location, "No saved tree found");
            return fallback();
        }
        Err(e) => {
            warn!(%location, error = %e, "Failed to read saved tree");
            return fallback();
        }
    };

    match parse_store(&text) {
        Ok(store) => {
            debug!(%location, members = store.len(), "Loaded tree");
            store
        }
        Err(e) => {
            warn!(%location, error = %e, "Saved tree is unreadable");
            fallback()
        }
    }
}

/// Write a store to storage.
pub async fn save_store(storage: &dyn TreeStorage, store: &FamilyStore) -> Result<(), PersistError> {
    let json = to_json(store)?;
    storage.write(&json).await?;
    debug!(location = %storage.describe(), members = store.len(), "Saved tree");
    Ok(())
}

/// A member as it may appear in older saves: every field optional, ids as
/// numbers or strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRecord {
    #[serde(default)]
    id: Value,
    name: Option<String>,
    gender: Option<Gender>,
    #[serde(default)]
    spouse_id: Value,
    parents: Option<Vec<Value>>,
    children: Option<Vec<Value>>,
    image_url: Option<String>,
    social_media: Option<String>,
    description: Option<String>,
    dob: Option<String>,
    dod: Option<String>,
}

impl MemberRecord {
    fn own_id(&self) -> Option<MemberId> {
        parse_id(&self.id)
    }

    fn into_member(self, id: MemberId) -> Member {
        let ids = |list: Option<Vec<Value>>| -> Vec<MemberId> {
            list.unwrap_or_default().iter().filter_map(parse_id).collect()
        };
        Member {
            id,
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unnamed".to_string()),
            gender: self.gender.unwrap_or_default(),
            spouse_id: parse_id(&self.spouse_id),
            parents: ids(self.parents),
            children: ids(self.children),
            image_url: self.image_url,
            social_media: self.social_media,
            description: self.description.unwrap_or_default(),
            dob: self.dob,
            dod: self.dod,
        }
    }
}

fn parse_id(value: &Value) -> Option<MemberId> {
    match value {
        Value::Null => None,
        other => MemberId::deserialize(other).ok(),
    }
}

fn looks_like_member_map(map: &Map<String, Value>) -> bool {
    map.values()
        .next()
        .and_then(Value::as_object)
        .is_some_and(|first| first.contains_key("id") || first.contains_key("name"))
}

fn parse_record(value: Value) -> Option<MemberRecord> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "Skipping unreadable member entry");
            None
        }
    }
}

fn from_entries(entries: Map<String, Value>) -> FamilyStore {
    let records = entries.into_iter().filter_map(|(key, value)| {
        let record = parse_record(value)?;
        let id = record.own_id().or_else(|| key.parse().ok());
        Some((id, record))
    });
    build_store(records)
}

fn from_items(items: Vec<Value>) -> FamilyStore {
    let records = items.into_iter().filter_map(|value| {
        let record = parse_record(value)?;
        Some((record.own_id(), record))
    });
    build_store(records)
}

fn build_store(records: impl Iterator<Item = (Option<MemberId>, MemberRecord)>) -> FamilyStore {
    let mut store = FamilyStore::new();
    let mut unkeyed = Vec::new();

    for (id, record) in records {
        match id {
            Some(id) => store.insert_raw(record.into_member(id)),
            None => unkeyed.push(record),
        }
    }
    // Fresh ids are handed out only after every explicit id is known.
    for record in unkeyed {
        let id = store.allocate_id();
        store.insert_raw(record.into_member(id));
    }

    let repairs = store.repair_references();
    if repairs > 0 {
        warn!(repairs, "Repaired inconsistent member references");
    }
    store
}

/// Get current timestamp as seconds since the epoch.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}
