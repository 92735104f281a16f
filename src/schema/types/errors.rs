use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NotFound(String),
    Duplicate(String),
    InvalidField(String),
    InvalidData(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SchemaError::Duplicate(msg) => write!(f, "Duplicate definition: {}", msg),
            SchemaError::InvalidField(msg) => write!(f, "Invalid field: {}", msg),
            SchemaError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}
