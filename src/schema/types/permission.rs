use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per (table, role) CRUD permission flags.
///
/// Informational within this core: the flags are stored, compiled into
/// the schema artifact and served to collaborators, but enforcement is
/// the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}
