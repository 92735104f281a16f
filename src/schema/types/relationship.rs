use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

/// A directed edge between two table fields.
///
/// Relationships are purely descriptive: the CRUD layer performs no
/// referential-integrity checks and no cascading deletes across related
/// tables. They exist so the compiled schema can describe how
/// collections relate to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    #[serde(default)]
    pub id: String,
    pub source_table: String,
    pub source_field: String,
    pub target_table: String,
    pub target_field: String,
    pub cardinality: Cardinality,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
