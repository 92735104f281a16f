pub mod compiler;
pub mod store;
pub mod types;
pub mod validator;

pub use compiler::{CompiledSchema, CompiledTable, SchemaCompiler};
pub use store::SchemaStore;
pub use types::{
    Cardinality, FieldDefinition, FieldOption, FieldType, PermissionDefinition,
    RelationshipDefinition, SchemaError, TableDefinition, ValidationRules,
};
