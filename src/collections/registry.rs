use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use log::debug;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::service::CrudError;

/// The per-table handle through which generic CRUD operations read and
/// write records.
///
/// An accessor binds one sled tree (`records:{table}`) and moves raw
/// JSON objects in and out of it. It never validates or transforms
/// record contents; validation is layered strictly on top of it.
pub struct CollectionAccessor {
    table_name: String,
    tree: sled::Tree,
}

impl CollectionAccessor {
    fn new(db: &sled::Db, table_name: &str) -> Result<Self, CrudError> {
        let tree = db
            .open_tree(format!("records:{}", table_name))
            .map_err(|e| CrudError::Storage(format!("Failed to open collection tree: {}", e)))?;
        Ok(Self {
            table_name: table_name.to_string(),
            tree,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Insert a record, assigning a generated id and timestamps.
    pub fn insert(&self, mut record: Map<String, Value>) -> Result<Map<String, Value>, CrudError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert("created_at".to_string(), Value::String(now.clone()));
        record.insert("updated_at".to_string(), Value::String(now));
        self.put(&id, &record)?;
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Option<Map<String, Value>>, CrudError> {
        match self.tree.get(id.as_bytes()) {
            Ok(Some(bytes)) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    CrudError::Storage(format!("Record deserialization failed: {}", e))
                })?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(CrudError::Storage(format!("Record retrieval failed: {}", e))),
        }
    }

    pub fn all(&self) -> Result<Vec<Map<String, Value>>, CrudError> {
        let mut records = Vec::new();
        for result in self.tree.iter() {
            let (_, bytes) = result
                .map_err(|e| CrudError::Storage(format!("Collection scan failed: {}", e)))?;
            let record = serde_json::from_slice(&bytes)
                .map_err(|e| CrudError::Storage(format!("Record deserialization failed: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Replace a record's contents. Identity and creation timestamp are
    /// preserved; last write wins. Returns `None` for an unknown id.
    pub fn update(
        &self,
        id: &str,
        mut record: Map<String, Value>,
    ) -> Result<Option<Map<String, Value>>, CrudError> {
        let existing = match self.get(id)? {
            Some(existing) => existing,
            None => return Ok(None),
        };
        record.insert("id".to_string(), Value::String(id.to_string()));
        if let Some(created_at) = existing.get("created_at") {
            record.insert("created_at".to_string(), created_at.clone());
        }
        record.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.put(id, &record)?;
        Ok(Some(record))
    }

    pub fn delete(&self, id: &str) -> Result<bool, CrudError> {
        let existed = self
            .tree
            .remove(id.as_bytes())
            .map_err(|e| CrudError::Storage(format!("Record delete failed: {}", e)))?
            .is_some();
        self.flush()?;
        Ok(existed)
    }

    pub fn count(&self) -> u64 {
        self.tree.len() as u64
    }

    fn put(&self, id: &str, record: &Map<String, Value>) -> Result<(), CrudError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CrudError::Storage(format!("Record serialization failed: {}", e)))?;
        self.tree
            .insert(id.as_bytes(), bytes)
            .map_err(|e| CrudError::Storage(format!("Record store failed: {}", e)))?;
        self.flush()
    }

    fn flush(&self) -> Result<(), CrudError> {
        self.tree
            .flush()
            .map_err(|e| CrudError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

/// Lazily creates and caches exactly one [`CollectionAccessor`] per
/// table name for the process lifetime.
///
/// First access opens the backing tree; the write lock is re-checked
/// after acquisition so a creation race between two requests for the
/// same name still yields a single shared accessor.
pub struct CollectionRegistry {
    db: sled::Db,
    accessors: RwLock<HashMap<String, Arc<CollectionAccessor>>>,
}

impl CollectionRegistry {
    pub fn new(db: sled::Db) -> Self {
        Self {
            db,
            accessors: RwLock::new(HashMap::new()),
        }
    }

    pub fn accessor(&self, table_name: &str) -> Result<Arc<CollectionAccessor>, CrudError> {
        {
            let cache = self
                .accessors
                .read()
                .map_err(|_| CrudError::Storage("Cannot lock accessor cache".into()))?;
            if let Some(accessor) = cache.get(table_name) {
                return Ok(accessor.clone());
            }
        }

        let mut cache = self
            .accessors
            .write()
            .map_err(|_| CrudError::Storage("Cannot lock accessor cache".into()))?;
        if let Some(accessor) = cache.get(table_name) {
            return Ok(accessor.clone());
        }
        debug!("Opening collection accessor for '{}'", table_name);
        let accessor = Arc::new(CollectionAccessor::new(&self.db, table_name)?);
        cache.insert(table_name.to_string(), accessor.clone());
        Ok(accessor)
    }

    #[cfg(test)]
    pub fn cached_count(&self) -> usize {
        self.accessors.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accessor_is_memoized() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let registry = CollectionRegistry::new(db);

        let first = registry.accessor("products").unwrap();
        let second = registry.accessor("products").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn concurrent_first_access_creates_single_accessor() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let registry = Arc::new(CollectionRegistry::new(db));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.accessor("products").unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.cached_count(), 1);
    }

    #[test]
    fn insert_assigns_id_and_timestamps() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let registry = CollectionRegistry::new(db);
        let accessor = registry.accessor("products").unwrap();

        let mut record = Map::new();
        record.insert("name".to_string(), Value::String("Widget".to_string()));
        let stored = accessor.insert(record).unwrap();

        let id = stored.get("id").and_then(Value::as_str).unwrap();
        assert!(!id.is_empty());
        assert!(stored.contains_key("created_at"));
        assert!(stored.contains_key("updated_at"));
        assert_eq!(accessor.count(), 1);

        let fetched = accessor.get(id).unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[test]
    fn update_preserves_identity_and_created_at() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let registry = CollectionRegistry::new(db);
        let accessor = registry.accessor("products").unwrap();

        let mut record = Map::new();
        record.insert("name".to_string(), Value::String("Widget".to_string()));
        let stored = accessor.insert(record).unwrap();
        let id = stored.get("id").and_then(Value::as_str).unwrap().to_string();
        let created_at = stored.get("created_at").cloned().unwrap();

        let mut replacement = Map::new();
        replacement.insert("name".to_string(), Value::String("Gadget".to_string()));
        let updated = accessor.update(&id, replacement).unwrap().unwrap();

        assert_eq!(updated.get("id").and_then(Value::as_str), Some(id.as_str()));
        assert_eq!(updated.get("created_at"), Some(&created_at));
        assert_eq!(
            updated.get("name").and_then(Value::as_str),
            Some("Gadget")
        );
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let registry = CollectionRegistry::new(db);
        let accessor = registry.accessor("products").unwrap();
        assert!(accessor.update("missing", Map::new()).unwrap().is_none());
    }
}
