use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing one logical record collection.
///
/// The `table_name` is the collection handle used everywhere else in the
/// system: record trees, field keys, compiled schema keys and the REST
/// path parameter all refer to it. It is assigned at creation time and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table_name: String,
    pub table_label: String,
    #[serde(default)]
    pub table_description: String,
    #[serde(default)]
    pub table_icon: Option<String>,
    #[serde(default)]
    pub table_group: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TableDefinition {
    pub fn new(table_name: impl Into<String>, table_label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            table_name: table_name.into(),
            table_label: table_label.into(),
            table_description: String::new(),
            table_icon: None,
            table_group: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}
