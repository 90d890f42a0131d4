//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use native_db::*;
use serde_json::Value as Json;
use std::path::Path;
use std::sync::LazyLock;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredDocument>().unwrap();
    models
});

/// Database store for raw entity catalogs.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        tracing::info!(path = %path.as_ref().display(), "store opened");
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Save a JSON document under `key`, replacing any previous one.
    pub fn save_document(&self, key: &str, value: &Json) -> Result<()> {
        let stored = StoredDocument::from_json(key, value)?;
        let rw = self.db.rw_transaction()?;
        rw.upsert(stored)?;
        rw.commit()?;
        Ok(())
    }

    /// Load the JSON document stored under `key`.
    pub fn load_document(&self, key: &str) -> Result<Option<Json>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredDocument> = r.get().primary(key.to_string())?;
        Ok(stored.map(|s| s.to_json()).transpose()?)
    }

    /// Delete the document stored under `key`; returns `true` if one existed.
    pub fn delete_document(&self, key: &str) -> Result<bool> {
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredDocument> = rw.get().primary(key.to_string())?;
        let existed = stored.is_some();
        if let Some(s) = stored {
            rw.remove(s)?;
        }
        rw.commit()?;
        Ok(existed)
    }

    /// Clear all data.
    pub fn clear(&self) -> Result<()> {
        let keys = self.document_keys()?;
        let rw = self.db.rw_transaction()?;
        for key in keys {
            if let Some(document) = rw.get().primary::<StoredDocument>(key)? {
                rw.remove(document)?;
            }
        }
        rw.commit()?;
        Ok(())
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}
