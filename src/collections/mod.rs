pub mod registry;
pub mod service;

pub use registry::{CollectionAccessor, CollectionRegistry};
pub use service::{
    CollectionStats, CrudError, GenericCrudService, ListParams, ListResult, Pagination,
};
