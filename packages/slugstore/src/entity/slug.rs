use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, Condition, QueryOrder, Set, SqlErr, TransactionSession, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::error::{SlugError, SlugResult};
use crate::owner::OwnerRef;

/// Width of the `slug`, `scope` and `owner_type` columns, in characters.
pub const MAX_SLUG_LENGTH: usize = 126;

/// One current or historical slug of an owner.
///
/// Rows are never renamed. A new slug is a new row and the previous one
/// is kept inactive so that old links still resolve.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slugs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(StringLen::N(126))")]
    pub owner_type: String,
    pub owner_id: i64,

    #[sea_orm(default_value = true)]
    pub active: bool,

    #[sea_orm(column_type = "String(StringLen::N(126))")]
    pub slug: String,
    /// URL path prefix, slash included. `None` is the universal scope.
    #[sea_orm(column_type = "String(StringLen::N(126))", nullable)]
    pub scope: Option<String>,

    pub created_at: Option<DateTimeUtc>,
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.validate(db, insert).await.map_err(|err| match err {
            SlugError::Database(e) => e,
            other => DbErr::Custom(other.to_string()),
        })?;
        Ok(self)
    }
}

impl ActiveModel {
    /// Rejects saves that would rename a row or leave two active rows for
    /// one owner.
    ///
    /// Only a save that sets `active` to true (or inserts with the column
    /// default) is checked for other active rows, so metadata edits on
    /// inactive rows go through while another row is active.
    async fn validate<C: ConnectionTrait>(&self, db: &C, insert: bool) -> SlugResult<()> {
        if !insert && (self.slug.is_set() || self.scope.is_set()) {
            return Err(SlugError::InvalidSlug(
                "slug text and scope cannot change after creation".into(),
            ));
        }
        if let Some(text) = current(&self.slug) {
            validate_slug_text(text)?;
        }

        let becomes_active = match &self.active {
            ActiveValue::Set(active) => *active,
            ActiveValue::NotSet => insert,
            ActiveValue::Unchanged(_) => false,
        };
        if !becomes_active {
            return Ok(());
        }

        let id = current(&self.id).copied();
        let owner = match (current(&self.owner_type), current(&self.owner_id)) {
            (Some(owner_type), Some(owner_id)) => OwnerRef::new(owner_type.clone(), *owner_id),
            _ => match id {
                Some(id) => Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| SlugError::NotFound(format!("slug row {id}")))?
                    .owner_ref(),
                None => return Ok(()),
            },
        };

        ensure_no_other_active(db, &owner, id).await
    }
}

fn current<V: Into<Value>>(value: &ActiveValue<V>) -> Option<&V> {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
        ActiveValue::NotSet => None,
    }
}

impl Model {
    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type.clone(), self.owner_id)
    }

    /// Scope and slug joined, as it appears in a URL path.
    pub fn path(&self) -> String {
        format!("{}{}", self.scope.as_deref().unwrap_or_default(), self.slug)
    }

    /// Makes this row the owner's active slug and deactivates every other row
    /// of the same owner in one transaction.
    pub async fn activate<C>(self, conn: &C) -> SlugResult<Model>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = conn.begin().await?;
        deactivate_all(&txn, &self.owner_ref(), Some(self.id)).await?;

        let mut active: ActiveModel = self.into();
        active.active = Set(true);
        let model = active.update(&txn).await?;

        txn.commit().await?;
        Ok(model)
    }
}

/// Fields of a slug row that is about to be inserted.
#[derive(Clone, Debug)]
pub struct NewSlug {
    pub owner: OwnerRef,
    pub slug: String,
    pub scope: Option<String>,
}

/// Inserts a slug row.
///
/// With `active = true` the owner must not already have an active row. A
/// unique index hit on (owner_type, scope, slug) becomes
/// [`SlugError::StorageConflict`].
pub async fn create<C: ConnectionTrait>(
    conn: &C,
    new: NewSlug,
    active: bool,
) -> SlugResult<Model> {
    validate_slug_text(&new.slug)?;
    if active {
        ensure_no_other_active(conn, &new.owner, None).await?;
    }

    let owner = new.owner.clone();
    let slug = new.slug.clone();
    let model = ActiveModel {
        owner_type: Set(new.owner.owner_type),
        owner_id: Set(new.owner.owner_id),
        active: Set(active),
        slug: Set(new.slug),
        scope: Set(normalize_scope(new.scope)),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    };

    match model.insert(conn).await {
        Ok(inserted) => Ok(inserted),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(SlugError::StorageConflict { owner, slug })
        }
        Err(e) => Err(e.into()),
    }
}

/// Marks every row of `owner` inactive, optionally sparing one row.
pub async fn deactivate_all<C: ConnectionTrait>(
    conn: &C,
    owner: &OwnerRef,
    except: Option<i32>,
) -> SlugResult<u64> {
    let mut update = Entity::update_many()
        .col_expr(Column::Active, Expr::value(false))
        .filter(for_owner(owner))
        .filter(Column::Active.eq(true));
    if let Some(id) = except {
        update = update.filter(Column::Id.ne(id));
    }

    Ok(update.exec(conn).await?.rows_affected)
}

/// All rows of `owner`, oldest first.
pub async fn find_for_owner<C: ConnectionTrait>(conn: &C, owner: &OwnerRef) -> SlugResult<Vec<Model>> {
    Ok(Entity::find()
        .filter(for_owner(owner))
        .order_by_asc(Column::Id)
        .all(conn)
        .await?)
}

pub async fn find_active<C: ConnectionTrait>(conn: &C, owner: &OwnerRef) -> SlugResult<Option<Model>> {
    Ok(Entity::find()
        .filter(for_owner(owner))
        .filter(Column::Active.eq(true))
        .one(conn)
        .await?)
}

pub fn for_owner(owner: &OwnerRef) -> Condition {
    Condition::all()
        .add(Column::OwnerType.eq(owner.owner_type.as_str()))
        .add(Column::OwnerId.eq(owner.owner_id))
}

/// Matches rows in `scope`; no scope (or an empty one) is the universal scope.
pub fn in_scope(scope: Option<&str>) -> Condition {
    match scope.filter(|s| !s.is_empty()) {
        Some(scope) => Condition::all().add(Column::Scope.eq(scope)),
        None => Condition::any()
            .add(Column::Scope.is_null())
            .add(Column::Scope.eq("")),
    }
}

/// Empty scopes are stored as NULL.
pub fn normalize_scope(scope: Option<String>) -> Option<String> {
    scope.filter(|s| !s.is_empty())
}

pub fn validate_slug_text(text: &str) -> SlugResult<()> {
    if text.is_empty() {
        return Err(SlugError::InvalidSlug("slug cannot be empty".into()));
    }
    let len = text.chars().count();
    if len > MAX_SLUG_LENGTH {
        return Err(SlugError::InvalidSlug(format!(
            "slug is {len} characters, limit is {MAX_SLUG_LENGTH}"
        )));
    }
    Ok(())
}

async fn ensure_no_other_active<C: ConnectionTrait>(
    conn: &C,
    owner: &OwnerRef,
    id: Option<i32>,
) -> SlugResult<()> {
    let mut query = Entity::find()
        .filter(for_owner(owner))
        .filter(Column::Active.eq(true));
    if let Some(id) = id {
        query = query.filter(Column::Id.ne(id));
    }

    if query.count(conn).await? > 0 {
        return Err(SlugError::InvalidActivation(owner.clone()));
    }
    Ok(())
}
