use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use super::{SlugConnection, SlugService};
use crate::entity::slug::{self, NewSlug};
use crate::error::{SlugError, SlugResult};
use crate::owner::{OwnerRef, Sluggable};
use crate::slugged::SluggedConfig;

/// Insert attempts before a unique index hit is reported as exhaustion.
const MAX_INSERT_ATTEMPTS: u32 = 2;

impl<C: SlugConnection> SlugService<'_, C> {
    /// Give `owner` the right active slug after it has been saved.
    ///
    /// A slug the owner already has (active or not) is preferred over a new
    /// row, so unchanged names never churn history. Otherwise the first
    /// candidate free within the owner's type and scope is inserted and
    /// every older row is deactivated. Both paths run in one transaction.
    #[instrument(skip(self, owner, config), fields(owner = %owner.owner_ref()))]
    pub async fn allocate<O: Sluggable>(
        &self,
        owner: &O,
        config: &SluggedConfig<O>,
    ) -> SlugResult<slug::Model> {
        let owner_ref = owner.owner_ref();
        let candidates = config.candidates(owner)?;
        let scope = config.scope_for(owner);

        let txn = self.begin().await?;
        let model = allocate_in(&txn, &owner_ref, &candidates, scope).await?;
        txn.commit().await?;

        self.cache.invalidate(&owner_ref);
        Ok(model)
    }
}

async fn allocate_in(
    txn: &DatabaseTransaction,
    owner: &OwnerRef,
    candidates: &[String],
    scope: Option<String>,
) -> SlugResult<slug::Model> {
    let owned = slug::find_for_owner(txn, owner).await?;
    let reusable = candidates
        .iter()
        .find_map(|candidate| owned.iter().find(|row| &row.slug == candidate));

    if let Some(existing) = reusable {
        debug!(slug = %existing.slug, "Reusing existing slug");
        return existing.clone().activate(txn).await;
    }

    let scope = scope.as_deref();
    insert_first_free(txn, owner, candidates, scope, async || {
        taken_slugs(txn, owner, scope, candidates).await
    })
    .await
}

/// Inserts the first candidate `taken` does not report, as the owner's only
/// active row.
///
/// `taken` is asked again before every attempt. An insert rejected by the
/// unique index is rolled back to its savepoint and retried, up to
/// [`MAX_INSERT_ATTEMPTS`] times.
async fn insert_first_free<F>(
    txn: &DatabaseTransaction,
    owner: &OwnerRef,
    candidates: &[String],
    scope: Option<&str>,
    mut taken: F,
) -> SlugResult<slug::Model>
where
    F: AsyncFnMut() -> SlugResult<Vec<String>>,
{
    for attempt in 1..=MAX_INSERT_ATTEMPTS {
        let occupied = taken().await?;
        let Some(chosen) = candidates.iter().find(|c| !occupied.contains(*c)) else {
            warn!(tried = %candidates.join(", "), "No free slug candidate");
            return Err(exhausted(owner, candidates));
        };

        // Savepoint, so a unique index hit leaves the outer transaction usable.
        let attempt_txn = txn.begin().await?;
        slug::deactivate_all(&attempt_txn, owner, None).await?;
        let new = NewSlug {
            owner: owner.clone(),
            slug: chosen.clone(),
            scope: scope.map(str::to_owned),
        };

        match slug::create(&attempt_txn, new, true).await {
            Ok(model) => {
                attempt_txn.commit().await?;
                info!(slug = %model.slug, scope = ?model.scope, "Allocated new slug");
                return Ok(model);
            }
            Err(SlugError::StorageConflict { slug, .. }) => {
                attempt_txn.rollback().await?;
                warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    warn!(attempts = MAX_INSERT_ATTEMPTS, "Gave up after repeated slug conflicts");
    Err(exhausted(owner, candidates))
}

/// Candidates already used by any owner of the same type in `scope`.
async fn taken_slugs(
    txn: &DatabaseTransaction,
    owner: &OwnerRef,
    scope: Option<&str>,
    candidates: &[String],
) -> SlugResult<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let taken: Vec<String> = slug::Entity::find()
        .select_only()
        .column(slug::Column::Slug)
        .filter(slug::Column::OwnerType.eq(owner.owner_type.as_str()))
        .filter(slug::in_scope(scope))
        .filter(slug::Column::Slug.is_in(candidates.iter().cloned()))
        .into_tuple()
        .all(txn)
        .await?;

    Ok(taken)
}

fn exhausted(owner: &OwnerRef, candidates: &[String]) -> SlugError {
    SlugError::AllocationExhausted {
        owner: owner.clone(),
        tried: candidates.to_vec(),
    }
}
