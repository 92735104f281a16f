use std::fmt;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::registry::{CollectionAccessor, CollectionRegistry};
use crate::schema::validator;
use crate::schema::{SchemaError, SchemaStore};

/// Conventional text fields matched by the `search` parameter. Fields
/// absent on a given table simply never match.
pub const SEARCH_FIELDS: [&str; 4] = ["name", "title", "email", "sku"];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone)]
pub enum CrudError {
    /// One or more field-level validation messages. The record either
    /// fully validates or no write occurs.
    Validation(Vec<String>),
    NotFound(String),
    Schema(SchemaError),
    Storage(String),
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrudError::Validation(messages) => {
                write!(f, "Validation failed: {}", messages.join(", "))
            }
            CrudError::NotFound(msg) => write!(f, "{}", msg),
            CrudError::Schema(err) => write!(f, "Schema error: {}", err),
            CrudError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CrudError {}

impl From<SchemaError> for CrudError {
    fn from(error: SchemaError) -> Self {
        match error {
            // Keep not-found distinguishable so callers can branch.
            SchemaError::NotFound(msg) => CrudError::NotFound(msg),
            other => CrudError::Schema(other),
        }
    }
}

/// Parameters for the fixed search/sort/paginate contract of `list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub pages: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

/// Generic CRUD operations over any named collection.
///
/// Every operation resolves the table definition first (unknown
/// collections are a NotFound, not an implicit create), then validates
/// through the schema-derived field definitions before any write
/// reaches the accessor.
pub struct GenericCrudService {
    store: Arc<SchemaStore>,
    registry: Arc<CollectionRegistry>,
}

impl GenericCrudService {
    pub fn new(store: Arc<SchemaStore>, registry: Arc<CollectionRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn create(
        &self,
        table_name: &str,
        payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, CrudError> {
        let accessor = self.resolve(table_name)?;
        self.validate_payload(table_name, &payload)?;
        let record = accessor.insert(payload)?;
        info!(
            "Created record {} in '{}'",
            record.get("id").and_then(Value::as_str).unwrap_or("?"),
            table_name
        );
        Ok(record)
    }

    pub fn get_by_id(&self, table_name: &str, id: &str) -> Result<Map<String, Value>, CrudError> {
        let accessor = self.resolve(table_name)?;
        accessor.get(id)?.ok_or_else(|| {
            CrudError::NotFound(format!("Record '{}' not found in '{}'", id, table_name))
        })
    }

    pub fn list(&self, table_name: &str, params: &ListParams) -> Result<ListResult, CrudError> {
        let accessor = self.resolve(table_name)?;
        let mut records = accessor.all()?;

        if let Some(query) = params.search.as_deref().map(str::trim) {
            if !query.is_empty() {
                let needle = query.to_lowercase();
                records.retain(|record| matches_search(record, &needle));
            }
        }

        let total = records.len() as u64;

        let sort_by = params.sort_by.as_deref().unwrap_or("id");
        records.sort_by(|a, b| compare_values(a.get(sort_by), b.get(sort_by)));
        let descending = !matches!(params.sort_order.as_deref(), Some("asc"));
        if descending {
            records.reverse();
        }

        let page = params.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        let start = ((page - 1) * limit) as usize;
        let data: Vec<Value> = records
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .map(Value::Object)
            .collect();

        Ok(ListResult {
            data,
            pagination: Pagination {
                current: page,
                pages,
                total,
            },
        })
    }

    pub fn update(
        &self,
        table_name: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, CrudError> {
        let accessor = self.resolve(table_name)?;
        self.validate_payload(table_name, &payload)?;
        accessor.update(id, payload)?.ok_or_else(|| {
            CrudError::NotFound(format!("Record '{}' not found in '{}'", id, table_name))
        })
    }

    pub fn delete(&self, table_name: &str, id: &str) -> Result<(), CrudError> {
        let accessor = self.resolve(table_name)?;
        if !accessor.delete(id)? {
            return Err(CrudError::NotFound(format!(
                "Record '{}' not found in '{}'",
                id, table_name
            )));
        }
        Ok(())
    }

    /// Count records, split by the boolean `is_active` field.
    ///
    /// Tables whose schema has no `is_active` field report zero for
    /// both `active` and `inactive` while `total` stays the true count.
    /// Callers treat this as a known degenerate case of the contract.
    pub fn stats(&self, table_name: &str) -> Result<CollectionStats, CrudError> {
        let accessor = self.resolve(table_name)?;
        let fields = self.store.list_fields(table_name)?;
        let total = accessor.count();

        let has_is_active = fields.iter().any(|f| f.field_name == "is_active");
        if !has_is_active {
            return Ok(CollectionStats {
                total,
                active: 0,
                inactive: 0,
            });
        }

        let mut active = 0;
        let mut inactive = 0;
        for record in accessor.all()? {
            match record.get("is_active") {
                Some(Value::Bool(true)) => active += 1,
                Some(Value::Bool(false)) => inactive += 1,
                _ => {}
            }
        }
        Ok(CollectionStats {
            total,
            active,
            inactive,
        })
    }

    fn resolve(&self, table_name: &str) -> Result<Arc<CollectionAccessor>, CrudError> {
        if self.store.get_table(table_name)?.is_none() {
            return Err(CrudError::NotFound(format!(
                "Table '{}' not found",
                table_name
            )));
        }
        self.registry.accessor(table_name)
    }

    fn validate_payload(
        &self,
        table_name: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), CrudError> {
        let fields = self.store.list_fields(table_name)?;
        let errors = validator::validate(&fields, payload);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CrudError::Validation(errors))
        }
    }
}

fn matches_search(record: &Map<String, Value>, needle: &str) -> bool {
    SEARCH_FIELDS.iter().any(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .map_or(false, |text| text.to_lowercase().contains(needle))
    })
}

/// Total ordering over loosely-typed record values: absent sorts first,
/// then null, then typed comparisons, with a serialized-form fallback
/// for mixed types.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (x, y) => x.to_string().cmp(&y.to_string()),
        },
    }
}
