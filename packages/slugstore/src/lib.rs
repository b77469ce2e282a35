//! Stable, scoped slugs with history for records stored through SeaORM.
//!
//! Call [`SlugService::allocate`] after saving an owner record. Old slugs stay
//! in the `slugs` table as inactive rows, so [`SlugService::resolve`] keeps
//! finding the owner and [`SlugService::classify`] tells callers when to
//! redirect.

pub mod cache;
pub mod candidates;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod owner;
pub mod service;
pub mod slugged;

pub use cache::SlugCache;
pub use config::{AppConfig, SlugSettings};
pub use error::{SlugError, SlugResult};
pub use owner::{OwnerRef, Sluggable};
pub use service::{SlugConnection, SlugService, SlugStatus};
pub use slugged::SluggedConfig;
