//! Error taxonomy for the randomization engine.
use thiserror::Error;

use crate::entity::EntityId;

/// Fatal outcomes surfaced to the caller; the session produces no bundle.
#[derive(Debug, Error, PartialEq)]
pub enum RandomizerError {
    #[error(
        "scheduler gave up after {iterations} iterations at depth {depth}m with {pending} entities unresolved (last attempted: {})",
        .last.as_ref().map_or("none", EntityId::as_str)
    )]
    Unsatisfiable {
        iterations: u32,
        pending: usize,
        last: Option<EntityId>,
        depth: i32,
        stuck: Vec<EntityId>,
    },
    #[error("no usable {kind} records remained after validation")]
    NoUsableRecords { kind: &'static str },
    #[error(
        "progression graph gates on {} but the world does not define it",
        .missing.iter().map(EntityId::as_str).collect::<Vec<_>>().join(", ")
    )]
    MissingGateTools { missing: Vec<EntityId> },
    #[error("no biome can host fragment {entity}")]
    NoEligibleBiome { entity: EntityId },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("scheduler has already run")]
    AlreadyRan,
}

/// A single malformed input record; the record is skipped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    #[error("record {index} has an empty id")]
    EmptyId { index: usize },
    #[error("duplicate entity id {id}")]
    DuplicateId { id: EntityId },
    #[error("recipe of {id} lists itself as an ingredient")]
    SelfReference { id: EntityId },
    #[error("recipe of {id} lists {ingredient} more than once")]
    DuplicateIngredient { id: EntityId, ingredient: EntityId },
    #[error("recipe of {id} has a zero amount for {ingredient}")]
    ZeroAmount { id: EntityId, ingredient: EntityId },
    #[error("{id} references unknown entity {reference}")]
    UnknownReference { id: EntityId, reference: EntityId },
    #[error("location {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("location {index} unlocks unknown entity {id}")]
    UnknownLocationTarget { index: usize, id: EntityId },
    #[error("biome {name} has an invalid fragment rate {rate}")]
    InvalidRate { name: String, rate: f64 },
    #[error("biome record {index} has an empty name")]
    EmptyBiomeName { index: usize },
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("scan count bounds invalid (min {min} > max {max})")]
    ScanBounds { min: u32, max: u32 },
}
