//! PostgreSQL-backed financial store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::FinancialStore;
use crate::auth::{AuthError, AuthResult};
use crate::models::company::{Financial, FinancialDetail, FinancialQuery};
use crate::pagination::Pagination;

#[derive(Debug, sqlx::FromRow)]
struct FinancialRow {
    id: i64,
    uuid: Uuid,
    company_uuid: Uuid,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<FinancialRow> for Financial {
    fn from(row: FinancialRow) -> Self {
        Financial {
            id: row.id,
            uuid: row.uuid,
            company_uuid: row.company_uuid,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

const FINANCIAL_COLUMNS: &str = "id, uuid, company_uuid, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    id: i64,
    uuid: Uuid,
    value_cents: i64,
    created_at: DateTime<Utc>,
}

impl DetailRow {
    fn into_detail(self, financial_uuid: Uuid) -> FinancialDetail {
        FinancialDetail {
            id: self.id,
            uuid: self.uuid,
            financial_uuid,
            value_cents: self.value_cents,
            created_at: self.created_at,
        }
    }
}

fn push_financial_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &FinancialQuery) {
    qb.push(" WHERE TRUE");
    if let Some(company) = query.company {
        qb.push(" AND company_uuid = ").push_bind(company);
    }
}

#[derive(Clone)]
pub struct PgFinancialStore {
    pool: PgPool,
}

impl PgFinancialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FinancialStore for PgFinancialStore {
    async fn insert(&self, company_uuid: Uuid, created_by: Uuid) -> AuthResult<Financial> {
        let sql = format!(
            "INSERT INTO financials (uuid, company_uuid, created_by) VALUES ($1, $2, $3) \
             RETURNING {FINANCIAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, FinancialRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(company_uuid)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> AuthResult<Option<Financial>> {
        let sql = format!("SELECT {FINANCIAL_COLUMNS} FROM financials WHERE uuid = $1");
        let row = sqlx::query_as::<_, FinancialRow>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Financial::from))
    }

    async fn list(&self, query: &FinancialQuery) -> AuthResult<(Vec<Financial>, i64)> {
        let page = Pagination::new(query.page, query.limit);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM financials");
        push_financial_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {FINANCIAL_COLUMNS} FROM financials"));
        push_financial_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select
            .build_query_as::<FinancialRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Financial::from).collect(), total))
    }

    async fn delete_by_uuid(&self, uuid: Uuid) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM financials WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
    async fn insert_detail(
        &self,
        financial: &Financial,
        value_cents: i64,
    ) -> AuthResult<FinancialDetail> {
        let row = sqlx::query_as::<_, DetailRow>(
            "INSERT INTO financial_details (uuid, financial_id, value_cents) VALUES ($1, $2, $3) \
             RETURNING id, uuid, value_cents, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(financial.id)
        .bind(value_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Parent deleted since it was loaded.
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AuthError::NotFound("Financial not found".into())
            }
            _ => AuthError::from(e),
        })?;
        Ok(row.into_detail(financial.uuid))
    }

    async fn list_details(&self, financial: &Financial) -> AuthResult<Vec<FinancialDetail>> {
        let rows = sqlx::query_as::<_, DetailRow>(
            "SELECT id, uuid, value_cents, created_at FROM financial_details \
             WHERE financial_id = $1 ORDER BY id",
        )
        .bind(financial.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_detail(financial.uuid))
            .collect())
    }
}
