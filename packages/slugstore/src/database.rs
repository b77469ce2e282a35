use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::slug;

/// Uniqueness of (owner_type, scope, slug) with a missing scope treated as
/// one value. A plain unique index would let NULL scopes repeat.
const UNIQUE_SLUG_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS slugs_unique \
     ON slugs (owner_type, (COALESCE(scope, '')), slug)";

/// At most one active row per owner.
const ONE_ACTIVE_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS slugs_one_active \
     ON slugs (owner_type, owner_id) WHERE active";

/// Open the connection pool without touching the schema.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    // Set connection pool options
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .acquire_timeout(Duration::from_secs(config.timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    Database::connect(opt).await
}

/// Open the connection pool and create the schema when missing.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = connect(config).await?;
    ensure_schema(&db).await?;

    Ok(db)
}

/// Create the `slugs` table and its indexes when missing.
///
/// Only PostgreSQL and SQLite are supported.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    let table = Schema::new(backend)
        .create_table_from_entity(slug::Entity)
        .if_not_exists()
        .to_owned();

    // Per-owner lookups: WHERE owner_type = ? AND owner_id = ? AND active = ?
    let for_record = Index::create()
        .if_not_exists()
        .name("slugs_for_record")
        .table(slug::Entity)
        .col(slug::Column::OwnerType)
        .col(slug::Column::OwnerId)
        .col(slug::Column::Active)
        .to_owned();

    let (table_sql, index_sql) = match backend {
        DbBackend::Postgres => (
            table.to_string(PostgresQueryBuilder),
            for_record.to_string(PostgresQueryBuilder),
        ),
        DbBackend::Sqlite => (
            table.to_string(SqliteQueryBuilder),
            for_record.to_string(SqliteQueryBuilder),
        ),
        other => {
            return Err(DbErr::Custom(format!(
                "unsupported database backend: {other:?}"
            )));
        }
    };

    db.execute_unprepared(&table_sql).await?;
    db.execute_unprepared(&index_sql).await?;
    db.execute_unprepared(UNIQUE_SLUG_INDEX).await?;
    db.execute_unprepared(ONE_ACTIVE_INDEX).await?;

    info!("Ensured slugs table and indexes exist");

    Ok(())
}
