use crate::graph::Split;
use thiserror::Error;

/// Errors that can occur in lattix-sampling.
#[derive(Error, Debug)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Heads, tails and relations of a batch disagree in length.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// Tensors of one batch live on different devices.
    #[error("device mismatch: {0}")]
    DeviceMismatch(String),
    /// Id tensors must be rank 1.
    #[error("expected a rank-1 id tensor, got shape {0:?}")]
    Shape(Vec<usize>),
    /// Id tensors must hold `u8`, `u32` or `i64` values.
    #[error("unsupported id dtype {0:?}, expected u8, u32 or i64")]
    IdDType(candle_core::DType),
    /// An `i64` id that does not fit in `u32`.
    #[error("id {0} is outside [0, u32::MAX]")]
    IdOutOfRange(i64),
    /// Entity id outside `[0, n_ent)`.
    #[error("entity {id} out of range (n_ent = {n_ent})")]
    EntityOutOfRange { id: u32, n_ent: usize },
    /// Relation id outside `[0, n_rel)`.
    #[error("relation {id} out of range (n_rel = {n_rel})")]
    RelationOutOfRange { id: u32, n_rel: usize },
    /// Unknown graph selector.
    #[error("invalid split '{0}', expected one of main, train, val, validation, test")]
    InvalidSplit(String),
    /// The requested graph was not supplied or holds no facts.
    #[error("no {0} graph supplied (or it is empty)")]
    MissingGraph(Split),
    /// An (entity, relation) key was never seen while building the candidate cache.
    #[error("no cached candidates for entity {entity} under relation {relation}")]
    CacheMiss { entity: u32, relation: u32 },
    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for lattix-sampling.
pub type Result<T> = std::result::Result<T, Error>;
