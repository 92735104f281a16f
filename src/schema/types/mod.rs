pub mod errors;
pub mod field;
pub mod permission;
pub mod relationship;
pub mod table;

pub use errors::SchemaError;
pub use field::{FieldDefinition, FieldOption, FieldType, ValidationRules};
pub use permission::PermissionDefinition;
pub use relationship::{Cardinality, RelationshipDefinition};
pub use table::TableDefinition;
