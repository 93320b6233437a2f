//! FamilySession - the owned state object front ends work against.
//!
//! A session holds the member store together with the storage it was loaded
//! from, applies mutations, and saves after each one. A failed save is
//! logged and remembered but never undoes the mutation: the in-memory store
//! stays authoritative for the rest of the session.

use crate::member::{Attachment, MemberId, MemberPatch, NewMember};
use crate::persist::{load_store_or, save_store, FileStorage, PersistError, TreeStorage};
use crate::sample::sample_store;
use crate::store::{FamilyStore, MemberError};
use crate::tree::{materialize, FamilyNode};
use std::path::PathBuf;
use tracing::{error, info};

/// Configuration for opening a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the JSON file the tree is kept in.
    pub data_path: PathBuf,

    /// Start from the sample family when nothing usable is saved.
    /// When false, start from an empty tree instead.
    pub sample_fallback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Environment variable that overrides the data path.
    pub const DATA_PATH_ENV: &'static str = "FAMILY_TREE_PATH";

    /// Data path used when nothing else is configured.
    pub const DEFAULT_DATA_PATH: &'static str = "family_tree.json";

    /// Create a config with default settings.
    pub fn new() -> Self {
        Self {
            data_path: PathBuf::from(Self::DEFAULT_DATA_PATH),
            sample_fallback: true,
        }
    }

    /// Create a config from the environment (and a `.env` file if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::new();
        if let Ok(path) = std::env::var(Self::DATA_PATH_ENV) {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path);
            }
        }
        config
    }

    /// Set the data path.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Choose whether to fall back to the sample family.
    pub fn with_sample_fallback(mut self, enabled: bool) -> Self {
        self.sample_fallback = enabled;
        self
    }
}

/// A family tree being viewed and edited.
pub struct FamilySession {
    store: FamilyStore,
    storage: Box<dyn TreeStorage>,
    last_save_error: Option<PersistError>,
}

impl FamilySession {
    /// Open the file-backed tree described by `config`.
    pub async fn open(config: SessionConfig) -> Self {
        let storage = FileStorage::new(config.data_path);
        Self::with_storage(storage, config.sample_fallback).await
    }

    /// Open a tree kept in any storage backend.
    pub async fn with_storage(storage: impl TreeStorage + 'static, sample_fallback: bool) -> Self {
        let store = if sample_fallback {
            load_store_or(&storage, sample_store).await
        } else {
            load_store_or(&storage, FamilyStore::new).await
        };
        info!(
            location = %storage.describe(),
            members = store.len(),
            "Opened family tree"
        );
        Self {
            store,
            storage: Box::new(storage),
            last_save_error: None,
        }
    }

    /// Current state of the tree.
    pub fn store(&self) -> &FamilyStore {
        &self.store
    }

    /// The tree as a display forest.
    pub fn forest(&self) -> Vec<FamilyNode> {
        materialize(&self.store)
    }

    /// Where the tree is saved.
    pub fn location(&self) -> String {
        self.storage.describe()
    }

    /// The error from the most recent save, if it failed.
    pub fn last_save_error(&self) -> Option<&PersistError> {
        self.last_save_error.as_ref()
    }

    /// Add a member and save.
    pub async fn add_member(
        &mut self,
        new: NewMember,
        attachment: Attachment,
    ) -> Result<MemberId, MemberError> {
        let id = self.store.add_member(new, attachment)?;
        self.persist().await;
        Ok(id)
    }

    /// Patch a member and save. Returns `Ok(false)` for an unknown id.
    pub async fn update_member(
        &mut self,
        id: MemberId,
        patch: MemberPatch,
    ) -> Result<bool, MemberError> {
        let updated = self.store.update_member(id, patch)?;
        if updated {
            self.persist().await;
        }
        Ok(updated)
    }

    /// Delete a member and save. Returns `false` for an unknown id.
    pub async fn delete_member(&mut self, id: MemberId) -> bool {
        let deleted = self.store.delete_member(id);
        if deleted {
            self.persist().await;
        }
        deleted
    }

    /// Save now, returning the outcome instead of only recording it.
    pub async fn save(&mut self) -> Result<(), PersistError> {
        save_store(self.storage.as_ref(), &self.store).await?;
        self.last_save_error = None;
        Ok(())
    }

    async fn persist(&mut self) {
        match save_store(self.storage.as_ref(), &self.store).await {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                error!(location = %self.storage.describe(), error = %e, "Failed to save family tree");
                self.last_save_error = Some(e);
            }
        }
    }
}
