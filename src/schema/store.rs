use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::schema::types::{
    FieldDefinition, PermissionDefinition, RelationshipDefinition, SchemaError, TableDefinition,
};

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").unwrap());

/// Durable store of table, field, relationship and permission
/// definitions, one sled tree per definition kind.
///
/// All writes enforce the uniqueness invariants (`table_name` globally
/// unique, `(table_name, field_name)` globally unique) and fail with
/// [`SchemaError::Duplicate`] when violated. Reads return field
/// definitions ordered by `field_order` ascending, ties broken by
/// creation order.
#[derive(Clone)]
pub struct SchemaStore {
    tables_tree: sled::Tree,
    fields_tree: sled::Tree,
    relationships_tree: sled::Tree,
    permissions_tree: sled::Tree,
}

impl SchemaStore {
    pub fn new(db: &sled::Db) -> Result<Self, sled::Error> {
        Ok(Self {
            tables_tree: db.open_tree("table_definitions")?,
            fields_tree: db.open_tree("field_definitions")?,
            relationships_tree: db.open_tree("relationship_definitions")?,
            permissions_tree: db.open_tree("permission_definitions")?,
        })
    }

    // ========== TABLES ==========

    pub fn create_table(&self, mut def: TableDefinition) -> Result<TableDefinition, SchemaError> {
        check_identifier("table_name", &def.table_name)?;
        if self.exists_in_tree(&self.tables_tree, &def.table_name)? {
            return Err(SchemaError::Duplicate(format!(
                "Table '{}' already exists",
                def.table_name
            )));
        }
        let now = chrono::Utc::now();
        def.created_at = now;
        def.updated_at = now;
        self.store_in_tree(&self.tables_tree, &def.table_name.clone(), &def)?;
        info!("Created table definition '{}'", def.table_name);
        Ok(def)
    }

    /// Update a table definition. The `table_name` identity and the
    /// creation timestamp of the stored definition are preserved.
    pub fn update_table(
        &self,
        name: &str,
        update: TableDefinition,
    ) -> Result<TableDefinition, SchemaError> {
        let existing: TableDefinition = self
            .get_from_tree(&self.tables_tree, name)?
            .ok_or_else(|| SchemaError::NotFound(format!("Table '{}' not found", name)))?;
        let mut def = update;
        def.table_name = existing.table_name;
        def.created_at = existing.created_at;
        def.updated_at = chrono::Utc::now();
        self.store_in_tree(&self.tables_tree, name, &def)?;
        Ok(def)
    }

    /// Delete a table definition, cascading away every field,
    /// relationship endpoint and permission that references it.
    pub fn delete_table(&self, name: &str) -> Result<(), SchemaError> {
        if !self.delete_from_tree(&self.tables_tree, name)? {
            return Err(SchemaError::NotFound(format!("Table '{}' not found", name)));
        }

        let field_keys = self.keys_with_prefix(&self.fields_tree, &format!("{}:", name))?;
        for key in &field_keys {
            self.delete_from_tree(&self.fields_tree, key)?;
        }

        let relationships: Vec<(String, RelationshipDefinition)> =
            self.list_items_in_tree(&self.relationships_tree)?;
        let mut removed_relationships = 0usize;
        for (key, rel) in relationships {
            if rel.source_table == name || rel.target_table == name {
                self.delete_from_tree(&self.relationships_tree, &key)?;
                removed_relationships += 1;
            }
        }

        let permission_keys =
            self.keys_with_prefix(&self.permissions_tree, &format!("{}:", name))?;
        for key in &permission_keys {
            self.delete_from_tree(&self.permissions_tree, key)?;
        }

        info!(
            "Deleted table '{}' ({} fields, {} relationships, {} permissions cascaded)",
            name,
            field_keys.len(),
            removed_relationships,
            permission_keys.len()
        );
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<Option<TableDefinition>, SchemaError> {
        self.get_from_tree(&self.tables_tree, name)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, SchemaError> {
        self.exists_in_tree(&self.tables_tree, name)
    }

    /// List all table definitions, sorted by table name (sled keys are
    /// iterated lexicographically, so no extra sort is needed).
    pub fn list_tables(&self) -> Result<Vec<TableDefinition>, SchemaError> {
        let items: Vec<(String, TableDefinition)> = self.list_items_in_tree(&self.tables_tree)?;
        Ok(items.into_iter().map(|(_, def)| def).collect())
    }

    // ========== FIELDS ==========

    pub fn create_field(&self, mut def: FieldDefinition) -> Result<FieldDefinition, SchemaError> {
        check_identifier("field_name", &def.field_name)?;
        if !self.table_exists(&def.table_name)? {
            return Err(SchemaError::NotFound(format!(
                "Table '{}' not found",
                def.table_name
            )));
        }
        validate_field_options(&def)?;
        let key = field_key(&def.table_name, &def.field_name);
        if self.exists_in_tree(&self.fields_tree, &key)? {
            return Err(SchemaError::Duplicate(format!(
                "Field '{}' already exists on table '{}'",
                def.field_name, def.table_name
            )));
        }
        let now = chrono::Utc::now();
        def.created_at = now;
        def.updated_at = now;
        self.store_in_tree(&self.fields_tree, &key, &def)?;
        Ok(def)
    }

    /// Update a field definition. Identity (`table_name`, `field_name`)
    /// and creation timestamp are preserved.
    pub fn update_field(
        &self,
        table_name: &str,
        field_name: &str,
        update: FieldDefinition,
    ) -> Result<FieldDefinition, SchemaError> {
        let key = field_key(table_name, field_name);
        let existing: FieldDefinition = self
            .get_from_tree(&self.fields_tree, &key)?
            .ok_or_else(|| {
                SchemaError::NotFound(format!(
                    "Field '{}' not found on table '{}'",
                    field_name, table_name
                ))
            })?;
        let mut def = update;
        def.table_name = existing.table_name;
        def.field_name = existing.field_name;
        def.created_at = existing.created_at;
        def.updated_at = chrono::Utc::now();
        validate_field_options(&def)?;
        self.store_in_tree(&self.fields_tree, &key, &def)?;
        Ok(def)
    }

    pub fn delete_field(&self, table_name: &str, field_name: &str) -> Result<(), SchemaError> {
        let key = field_key(table_name, field_name);
        if !self.delete_from_tree(&self.fields_tree, &key)? {
            return Err(SchemaError::NotFound(format!(
                "Field '{}' not found on table '{}'",
                field_name, table_name
            )));
        }
        Ok(())
    }

    pub fn get_field(
        &self,
        table_name: &str,
        field_name: &str,
    ) -> Result<Option<FieldDefinition>, SchemaError> {
        self.get_from_tree(&self.fields_tree, &field_key(table_name, field_name))
    }

    /// List a table's field definitions ordered by `field_order`
    /// ascending, ties broken by creation timestamp then name.
    pub fn list_fields(&self, table_name: &str) -> Result<Vec<FieldDefinition>, SchemaError> {
        let mut fields = Vec::new();
        for result in self.fields_tree.scan_prefix(format!("{}:", table_name)) {
            let (_, value) = result
                .map_err(|e| SchemaError::InvalidData(format!("Tree iteration failed: {}", e)))?;
            let def: FieldDefinition = serde_json::from_slice(&value)
                .map_err(|e| SchemaError::InvalidData(format!("Deserialization failed: {}", e)))?;
            fields.push(def);
        }
        fields.sort_by(|a, b| {
            a.field_order
                .cmp(&b.field_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.field_name.cmp(&b.field_name))
        });
        Ok(fields)
    }

    // ========== RELATIONSHIPS ==========

    pub fn create_relationship(
        &self,
        mut def: RelationshipDefinition,
    ) -> Result<RelationshipDefinition, SchemaError> {
        if !self.table_exists(&def.source_table)? {
            return Err(SchemaError::NotFound(format!(
                "Table '{}' not found",
                def.source_table
            )));
        }
        if !self.table_exists(&def.target_table)? {
            return Err(SchemaError::NotFound(format!(
                "Table '{}' not found",
                def.target_table
            )));
        }
        def.id = Uuid::new_v4().to_string();
        def.created_at = chrono::Utc::now();
        self.store_in_tree(&self.relationships_tree, &def.id.clone(), &def)?;
        Ok(def)
    }

    pub fn delete_relationship(&self, id: &str) -> Result<(), SchemaError> {
        if !self.delete_from_tree(&self.relationships_tree, id)? {
            return Err(SchemaError::NotFound(format!(
                "Relationship '{}' not found",
                id
            )));
        }
        Ok(())
    }

    pub fn list_relationships(&self) -> Result<Vec<RelationshipDefinition>, SchemaError> {
        let items: Vec<(String, RelationshipDefinition)> =
            self.list_items_in_tree(&self.relationships_tree)?;
        Ok(items.into_iter().map(|(_, def)| def).collect())
    }

    /// Relationships whose source or target is the given table.
    pub fn list_relationships_for(
        &self,
        table_name: &str,
    ) -> Result<Vec<RelationshipDefinition>, SchemaError> {
        Ok(self
            .list_relationships()?
            .into_iter()
            .filter(|r| r.source_table == table_name || r.target_table == table_name)
            .collect())
    }

    // ========== PERMISSIONS ==========

    /// Upsert the permission flags for a (table, role) pair.
    pub fn set_permission(
        &self,
        mut def: PermissionDefinition,
    ) -> Result<PermissionDefinition, SchemaError> {
        if !self.table_exists(&def.table_name)? {
            return Err(SchemaError::NotFound(format!(
                "Table '{}' not found",
                def.table_name
            )));
        }
        if def.role.trim().is_empty() {
            return Err(SchemaError::InvalidField("role cannot be empty".to_string()));
        }
        def.updated_at = chrono::Utc::now();
        let key = format!("{}:{}", def.table_name, def.role);
        self.store_in_tree(&self.permissions_tree, &key, &def)?;
        Ok(def)
    }

    pub fn delete_permission(&self, table_name: &str, role: &str) -> Result<(), SchemaError> {
        let key = format!("{}:{}", table_name, role);
        if !self.delete_from_tree(&self.permissions_tree, &key)? {
            return Err(SchemaError::NotFound(format!(
                "Permission for role '{}' not found on table '{}'",
                role, table_name
            )));
        }
        Ok(())
    }

    pub fn list_permissions(&self) -> Result<Vec<PermissionDefinition>, SchemaError> {
        let items: Vec<(String, PermissionDefinition)> =
            self.list_items_in_tree(&self.permissions_tree)?;
        Ok(items.into_iter().map(|(_, def)| def).collect())
    }

    pub fn list_permissions_for(
        &self,
        table_name: &str,
    ) -> Result<Vec<PermissionDefinition>, SchemaError> {
        let mut permissions = Vec::new();
        for result in self.permissions_tree.scan_prefix(format!("{}:", table_name)) {
            let (_, value) = result
                .map_err(|e| SchemaError::InvalidData(format!("Tree iteration failed: {}", e)))?;
            let def: PermissionDefinition = serde_json::from_slice(&value)
                .map_err(|e| SchemaError::InvalidData(format!("Deserialization failed: {}", e)))?;
            permissions.push(def);
        }
        Ok(permissions)
    }

    // ========== GENERIC TREE OPERATIONS ==========

    fn store_in_tree<T: Serialize>(
        &self,
        tree: &sled::Tree,
        key: &str,
        item: &T,
    ) -> Result<(), SchemaError> {
        let bytes = serde_json::to_vec(item)
            .map_err(|e| SchemaError::InvalidData(format!("Serialization failed: {}", e)))?;
        tree.insert(key.as_bytes(), bytes)
            .map_err(|e| SchemaError::InvalidData(format!("Store failed: {}", e)))?;
        tree.flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn get_from_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        key: &str,
    ) -> Result<Option<T>, SchemaError> {
        match tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => {
                let item = serde_json::from_slice(&bytes).map_err(|e| {
                    SchemaError::InvalidData(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(item))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SchemaError::InvalidData(format!("Retrieval failed: {}", e))),
        }
    }

    fn list_items_in_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
    ) -> Result<Vec<(String, T)>, SchemaError> {
        let mut items = Vec::new();
        for result in tree.iter() {
            let (key, value) = result
                .map_err(|e| SchemaError::InvalidData(format!("Tree iteration failed: {}", e)))?;
            let key_str = String::from_utf8_lossy(&key).to_string();
            let item = serde_json::from_slice(&value).map_err(|e| {
                SchemaError::InvalidData(format!(
                    "Deserialization failed for key '{}': {}",
                    key_str, e
                ))
            })?;
            items.push((key_str, item));
        }
        Ok(items)
    }

    fn keys_with_prefix(&self, tree: &sled::Tree, prefix: &str) -> Result<Vec<String>, SchemaError> {
        let mut keys = Vec::new();
        for result in tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = result
                .map_err(|e| SchemaError::InvalidData(format!("Failed to scan prefix: {}", e)))?;
            keys.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(keys)
    }

    fn delete_from_tree(&self, tree: &sled::Tree, key: &str) -> Result<bool, SchemaError> {
        let existed = tree
            .remove(key.as_bytes())
            .map_err(|e| SchemaError::InvalidData(format!("Delete failed: {}", e)))?
            .is_some();
        tree.flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;
        Ok(existed)
    }

    fn exists_in_tree(&self, tree: &sled::Tree, key: &str) -> Result<bool, SchemaError> {
        tree.contains_key(key.as_bytes())
            .map_err(|e| SchemaError::InvalidData(format!("Existence check failed: {}", e)))
    }
}

/// Field keys are `{table}:{field}`, which keeps a table's fields
/// contiguous under a prefix scan.
fn field_key(table_name: &str, field_name: &str) -> String {
    format!("{}:{}", table_name, field_name)
}

/// Identifiers become sled keys and URL path segments, so the allowed
/// alphabet excludes the `:` key separator.
fn check_identifier(what: &str, value: &str) -> Result<(), SchemaError> {
    if IDENT_RE.is_match(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidField(format!(
            "{} must be a non-empty identifier (letters, digits, '_' or '-'), got '{}'",
            what, value
        )))
    }
}

fn validate_field_options(def: &FieldDefinition) -> Result<(), SchemaError> {
    if def.field_type.requires_options() {
        let has_options = def
            .field_options
            .as_ref()
            .map(|opts| !opts.is_empty())
            .unwrap_or(false);
        if !has_options {
            return Err(SchemaError::InvalidField(format!(
                "Field '{}' of type {:?} requires field_options",
                def.field_name, def.field_type
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Cardinality, FieldType};
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, SchemaStore) {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = SchemaStore::new(&db).unwrap();
        (dir, store)
    }

    #[test]
    fn duplicate_table_rejected() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        let err = store
            .create_table(TableDefinition::new("products", "Products again"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate(_)));
    }

    #[test]
    fn duplicate_field_rejected_per_table_only() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        store
            .create_table(TableDefinition::new("orders", "Orders"))
            .unwrap();
        store
            .create_field(FieldDefinition::new(
                "products",
                "name",
                FieldType::String,
                "Name",
            ))
            .unwrap();
        // Same field name on another table is fine.
        store
            .create_field(FieldDefinition::new(
                "orders",
                "name",
                FieldType::String,
                "Name",
            ))
            .unwrap();
        let err = store
            .create_field(FieldDefinition::new(
                "products",
                "name",
                FieldType::String,
                "Name",
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate(_)));
    }

    #[test]
    fn field_requires_existing_table() {
        let (_dir, store) = open_store();
        let err = store
            .create_field(FieldDefinition::new(
                "missing",
                "name",
                FieldType::String,
                "Name",
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotFound(_)));
    }

    #[test]
    fn select_requires_options() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        let err = store
            .create_field(FieldDefinition::new(
                "products",
                "status",
                FieldType::Select,
                "Status",
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField(_)));
    }

    #[test]
    fn fields_ordered_by_field_order_then_creation() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        store
            .create_field(
                FieldDefinition::new("products", "b_field", FieldType::String, "B").with_order(2),
            )
            .unwrap();
        store
            .create_field(
                FieldDefinition::new("products", "a_field", FieldType::String, "A").with_order(1),
            )
            .unwrap();
        // Same order as b_field, created later: sorts after it.
        store
            .create_field(
                FieldDefinition::new("products", "c_field", FieldType::String, "C").with_order(2),
            )
            .unwrap();
        let names: Vec<String> = store
            .list_fields("products")
            .unwrap()
            .into_iter()
            .map(|f| f.field_name)
            .collect();
        assert_eq!(names, vec!["a_field", "b_field", "c_field"]);
    }

    #[test]
    fn field_prefix_scan_does_not_leak_across_similar_names() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("user", "User"))
            .unwrap();
        store
            .create_table(TableDefinition::new("user_profile", "User profile"))
            .unwrap();
        store
            .create_field(FieldDefinition::new(
                "user_profile",
                "bio",
                FieldType::Text,
                "Bio",
            ))
            .unwrap();
        assert!(store.list_fields("user").unwrap().is_empty());
    }

    #[test]
    fn delete_table_cascades() {
        let (_dir, store) = open_store();
        store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        store
            .create_table(TableDefinition::new("orders", "Orders"))
            .unwrap();
        store
            .create_field(FieldDefinition::new(
                "products",
                "name",
                FieldType::String,
                "Name",
            ))
            .unwrap();
        store
            .create_relationship(RelationshipDefinition {
                id: String::new(),
                source_table: "orders".to_string(),
                source_field: "product_id".to_string(),
                target_table: "products".to_string(),
                target_field: "id".to_string(),
                cardinality: Cardinality::OneToMany,
                created_at: chrono::Utc::now(),
            })
            .unwrap();
        store
            .set_permission(PermissionDefinition {
                table_name: "products".to_string(),
                role: "editor".to_string(),
                can_create: true,
                can_read: true,
                can_update: true,
                can_delete: false,
                updated_at: chrono::Utc::now(),
            })
            .unwrap();

        store.delete_table("products").unwrap();

        assert!(store.get_table("products").unwrap().is_none());
        assert!(store.list_fields("products").unwrap().is_empty());
        assert!(store.list_relationships().unwrap().is_empty());
        assert!(store.list_permissions_for("products").unwrap().is_empty());
    }

    #[test]
    fn update_table_preserves_identity() {
        let (_dir, store) = open_store();
        let created = store
            .create_table(TableDefinition::new("products", "Products"))
            .unwrap();
        let mut update = created.clone();
        update.table_name = "renamed".to_string();
        update.table_label = "Catalog".to_string();
        let stored = store.update_table("products", update).unwrap();
        assert_eq!(stored.table_name, "products");
        assert_eq!(stored.table_label, "Catalog");
        assert_eq!(stored.created_at, created.created_at);
    }

    #[test]
    fn invalid_identifier_rejected() {
        let (_dir, store) = open_store();
        let err = store
            .create_table(TableDefinition::new("bad:name", "Bad"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField(_)));
    }
}
