use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::default_true;

/// The closed set of field types a table definition may use.
///
/// Validation and compilation both match exhaustively on this enum, so
/// adding a new type is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Email,
    Url,
    Text,
    Select,
    Multiselect,
    File,
    Files,
    Json,
}

impl FieldType {
    /// Types whose values are picked from a configured option list.
    pub fn requires_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Multiselect)
    }
}

/// One value/label pair for select and multiselect fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Declarative validation rules attached to a field definition.
///
/// `custom` names an external rule identifier; it is carried through to
/// the compiled schema but dispatches to no built-in check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub custom: Option<String>,
}

/// Metadata describing one attribute of a table.
///
/// `(table_name, field_name)` is globally unique. `field_order` drives
/// presentation and validation iteration order; it need not be unique,
/// ties are broken by creation order. `ui_config` holds presentation
/// hints only and is never consulted by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(default)]
    pub table_name: String,
    pub field_name: String,
    pub field_type: FieldType,
    pub field_label: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub field_options: Option<Vec<FieldOption>>,
    #[serde(default)]
    pub validation_rules: Option<ValidationRules>,
    #[serde(default)]
    pub ui_config: Option<Value>,
    #[serde(default)]
    pub is_seo_field: bool,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_sortable: bool,
    #[serde(default)]
    pub is_display_field: bool,
    #[serde(default)]
    pub field_order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl FieldDefinition {
    pub fn new(
        table_name: impl Into<String>,
        field_name: impl Into<String>,
        field_type: FieldType,
        field_label: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            table_name: table_name.into(),
            field_name: field_name.into(),
            field_type,
            field_label: field_label.into(),
            is_required: false,
            default_value: None,
            placeholder: None,
            field_options: None,
            validation_rules: None,
            ui_config: None,
            is_seo_field: false,
            is_searchable: false,
            is_sortable: false,
            is_display_field: false,
            field_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.field_order = order;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = Some(rules);
        self
    }
}
