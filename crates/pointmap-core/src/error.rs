use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("Unknown field '{field}' for '{model}'")]
    UnknownField { model: String, field: String },

    #[error("No primary key defined for '{0}'")]
    MissingPrimaryKey(String),

    #[error("Operator '{op}' is not supported for field '{field}'")]
    UnsupportedOperator { op: String, field: String },

    #[error(
        "'not_in' is not supported for float field '{0}': the engine cannot \
         express negated float matches reliably; use range operators \
         (>, >=, <, <=) instead"
    )]
    FloatExclusion(String),

    #[error("Invalid vector for field '{field}': {reason}")]
    InvalidVector { field: String, reason: String },

    #[error("Invalid filter value for field '{field}': {reason}")]
    FilterValue { field: String, reason: String },

    #[error("Combined search weights must sum to a positive value")]
    NonPositiveWeights,

    #[error("Engine operation failed: {0}")]
    Engine(String),

    #[error("Serialization failed: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
