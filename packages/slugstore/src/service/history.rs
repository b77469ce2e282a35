use sea_orm::{EntityTrait, QueryFilter};
use tracing::{info, instrument};

use super::{SlugConnection, SlugService};
use crate::entity::slug;
use crate::error::SlugResult;
use crate::owner::OwnerRef;

impl<C: SlugConnection> SlugService<'_, C> {
    /// Every slug the owner has had, oldest first.
    pub async fn history(&self, owner: &OwnerRef) -> SlugResult<Vec<slug::Model>> {
        slug::find_for_owner(self.conn, owner).await
    }

    /// Make an existing row the owner's active slug.
    pub async fn activate(&self, row: slug::Model) -> SlugResult<slug::Model> {
        let owner = row.owner_ref();
        let model = row.activate(self.conn).await?;
        self.cache.invalidate(&owner);
        Ok(model)
    }

    /// Delete one slug row. Returns `false` when no such row exists.
    #[instrument(skip(self))]
    pub async fn delete_slug(&self, id: i32) -> SlugResult<bool> {
        let Some(row) = slug::Entity::find_by_id(id).one(self.conn).await? else {
            return Ok(false);
        };

        slug::Entity::delete_by_id(id).exec(self.conn).await?;
        self.cache.invalidate(&row.owner_ref());

        info!(owner = %row.owner_ref(), slug = %row.slug, "Deleted slug");
        Ok(true)
    }

    /// Delete all slugs of `owner`, typically when the owner itself is removed.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn delete_owner_slugs(&self, owner: &OwnerRef) -> SlugResult<u64> {
        let result = slug::Entity::delete_many()
            .filter(slug::for_owner(owner))
            .exec(self.conn)
            .await?;
        self.cache.invalidate(owner);

        info!(count = result.rows_affected, "Deleted owner slugs");
        Ok(result.rows_affected)
    }
}
