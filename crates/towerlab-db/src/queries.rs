//! Common query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;

impl Store {
    /// Keys of every stored document.
    pub fn document_keys(&self) -> Result<Vec<String>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredDocument>()?;
        let iter = scan.all()?;
        let documents: std::result::Result<Vec<StoredDocument>, _> = iter.collect();
        let documents = documents.map_err(|e| Error::Database(e.to_string()))?;
        Ok(documents.into_iter().map(|d| d.key).collect())
    }

    /// Check if a document is stored under `key`.
    pub fn has_document(&self, key: &str) -> Result<bool> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredDocument> = r.get().primary(key.to_string())?;
        Ok(stored.is_some())
    }
}
