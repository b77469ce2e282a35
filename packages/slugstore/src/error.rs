use sea_orm::DbErr;
use thiserror::Error;

use crate::owner::OwnerRef;

/// Errors raised by slug allocation, validation and lookup.
#[derive(Debug, Error)]
pub enum SlugError {
    /// Every configured generator produced nothing for the owner.
    #[error("All slug generators returned nothing for {0}")]
    GenerationExhausted(OwnerRef),

    /// No candidate, including the last-resort form, was free.
    #[error("Couldn't find a slug for {owner}; tried {}", tried.join(", "))]
    AllocationExhausted { owner: OwnerRef, tried: Vec<String> },

    /// Another row for the same owner is already active.
    #[error("{0} already has an active slug")]
    InvalidActivation(OwnerRef),

    /// The slug text itself is unusable (empty or too long).
    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    /// No row matched a lookup.
    #[error("No slug found: {0}")]
    NotFound(String),

    /// The unique index rejected an insert that passed the collision check.
    #[error("Slug '{slug}' was taken concurrently for {owner}")]
    StorageConflict { owner: OwnerRef, slug: String },

    #[error("Invalid slug configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type SlugResult<T> = std::result::Result<T, SlugError>;
