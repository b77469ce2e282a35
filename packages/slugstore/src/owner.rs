use std::fmt;

use serde::{Deserialize, Serialize};

/// Tagged reference to the record a slug belongs to.
///
/// Several entity kinds share the `slugs` table; `owner_type` tells them
/// apart and `owner_id` is the record's primary key within that kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: i64,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: i64) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}

/// A persisted record that carries slugs.
///
/// Implementors must already be saved: the owner id is embedded in the
/// last-resort slug and stored on every slug row.
pub trait Sluggable: Send + Sync {
    /// Discriminator stored in `slugs.owner_type`.
    const OWNER_TYPE: &'static str;

    fn owner_id(&self) -> i64;

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(Self::OWNER_TYPE, self.owner_id())
    }
}
