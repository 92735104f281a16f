use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::store::SchemaStore;
use crate::schema::types::{
    FieldDefinition, PermissionDefinition, RelationshipDefinition, SchemaError,
};

/// The compiled projection of one table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTable {
    pub label: String,
    pub description: String,
    pub icon: Option<String>,
    pub group: Option<String>,
    pub is_active: bool,
    pub fields: Vec<FieldDefinition>,
    pub relationships: Vec<RelationshipDefinition>,
    pub permissions: Vec<PermissionDefinition>,
}

/// The full compiled schema document, keyed by table name.
pub type CompiledSchema = BTreeMap<String, CompiledTable>;

/// Projects live SchemaStore contents into a static schema document.
///
/// The output is deterministic: tables are keyed through a `BTreeMap`,
/// fields arrive in `field_order` order and relationship/permission
/// lists are explicitly sorted, so two compilations with no intervening
/// store mutations serialize byte-for-byte identically. Downstream
/// consumers and the reconciler rely on that to diff successive
/// artifacts.
pub struct SchemaCompiler {
    store: Arc<SchemaStore>,
}

impl SchemaCompiler {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }

    pub fn compile(&self) -> Result<CompiledSchema, SchemaError> {
        let mut document = BTreeMap::new();
        for table in self.store.list_tables()? {
            let fields = self.store.list_fields(&table.table_name)?;

            let mut relationships = self.store.list_relationships_for(&table.table_name)?;
            relationships.sort_by(|a, b| {
                (&a.source_table, &a.source_field, &a.target_table, &a.target_field)
                    .cmp(&(&b.source_table, &b.source_field, &b.target_table, &b.target_field))
            });

            let mut permissions = self.store.list_permissions_for(&table.table_name)?;
            permissions.sort_by(|a, b| a.role.cmp(&b.role));

            document.insert(
                table.table_name.clone(),
                CompiledTable {
                    label: table.table_label,
                    description: table.table_description,
                    icon: table.table_icon,
                    group: table.table_group,
                    is_active: table.is_active,
                    fields,
                    relationships,
                    permissions,
                },
            );
        }
        Ok(document)
    }
}
