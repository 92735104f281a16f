pub mod collections;
pub mod error;
pub mod node;
pub mod reconciler;
pub mod schema;

pub use error::{RecordBaseError, RecordBaseResult};
pub use node::{AppState, NodeConfig, RecordBaseHttpServer, RecordBaseNode};
pub use reconciler::{ReconcilerStatus, SchemaReconciler};
pub use schema::{CompiledSchema, CompiledTable, SchemaCompiler, SchemaError, SchemaStore};
