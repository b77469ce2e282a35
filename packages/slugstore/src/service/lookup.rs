use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{SlugConnection, SlugService};
use crate::cache::CachedSlug;
use crate::entity::slug;
use crate::error::{SlugError, SlugResult};
use crate::owner::OwnerRef;

/// How a slug relates to a given owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlugStatus {
    /// The owner's current slug; serve the page.
    Active,
    /// An old slug of the owner; redirect to the current one.
    Inactive,
    /// Not a slug of this owner.
    Unknown,
}

/// Splits `path` into its scope (everything up to and including the last
/// `/`) and the final slug segment.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

impl<C: SlugConnection> SlugService<'_, C> {
    /// Owner of `slug` within `owner_type` and `scope`, active or not.
    ///
    /// Matching is exact; callers normalize case the way the slugifier does.
    #[instrument(skip(self))]
    pub async fn try_resolve(
        &self,
        owner_type: &str,
        scope: Option<&str>,
        slug: &str,
    ) -> SlugResult<Option<OwnerRef>> {
        let row = slug::Entity::find()
            .filter(slug::Column::OwnerType.eq(owner_type))
            .filter(slug::in_scope(scope))
            .filter(slug::Column::Slug.eq(slug))
            .one(self.conn)
            .await?;

        Ok(row.map(|row| row.owner_ref()))
    }

    /// Like [`Self::try_resolve`], but a miss is [`SlugError::NotFound`].
    pub async fn resolve(
        &self,
        owner_type: &str,
        scope: Option<&str>,
        slug: &str,
    ) -> SlugResult<OwnerRef> {
        self.try_resolve(owner_type, scope, slug)
            .await?
            .ok_or_else(|| {
                SlugError::NotFound(format!(
                    "{owner_type} '{}{slug}'",
                    scope.unwrap_or_default()
                ))
            })
    }

    pub async fn try_resolve_from_path(
        &self,
        owner_type: &str,
        path: &str,
    ) -> SlugResult<Option<OwnerRef>> {
        let (scope, slug) = split_path(path);
        self.try_resolve(owner_type, Some(scope), slug).await
    }

    pub async fn resolve_from_path(&self, owner_type: &str, path: &str) -> SlugResult<OwnerRef> {
        let (scope, slug) = split_path(path);
        self.resolve(owner_type, Some(scope), slug).await
    }

    /// Whether `slug` is the owner's current slug, an old one, or neither.
    /// Case-insensitive.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn classify(&self, owner: &OwnerRef, slug: &str) -> SlugResult<SlugStatus> {
        let wanted = slug.to_lowercase();
        let rows = slug::find_for_owner(self.conn, owner).await?;

        Ok(
            match rows.iter().find(|row| row.slug.to_lowercase() == wanted) {
                Some(row) if row.active => SlugStatus::Active,
                Some(_) => SlugStatus::Inactive,
                None => SlugStatus::Unknown,
            },
        )
    }

    /// Text of the owner's active slug.
    pub async fn current_slug(&self, owner: &OwnerRef) -> SlugResult<Option<String>> {
        Ok(self.derived(owner).await?.slug)
    }

    /// Scope and slug of the owner's active row, e.g. `clients/fancylad`.
    pub async fn current_path(&self, owner: &OwnerRef) -> SlugResult<Option<String>> {
        Ok(self.derived(owner).await?.path)
    }

    async fn derived(&self, owner: &OwnerRef) -> SlugResult<CachedSlug> {
        let caches = self.caches();
        if let Some(cached) = caches.then(|| self.cache.get(owner)).flatten() {
            return Ok(cached);
        }

        let epoch = self.cache.epoch();
        let active = slug::find_active(self.conn, owner).await?;
        let derived = CachedSlug {
            path: active.as_ref().map(slug::Model::path),
            slug: active.map(|row| row.slug),
        };
        if caches {
            self.cache.insert(owner.clone(), derived.clone(), epoch);
        }

        Ok(derived)
    }
}
