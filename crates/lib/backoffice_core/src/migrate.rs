//! Database migration support.
//!
//! Runs the SQL migrations embedded from `backoffice_core/migrations/`.

use sqlx::PgPool;

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
