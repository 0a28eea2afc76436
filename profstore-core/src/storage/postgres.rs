//! PostgreSQL backend
//!
//! Results live in `profiler_results`, the unviewed relation in
//! `profiler_unviewed` (presence = unviewed, `added_at` keeps insertion
//! order). The save+reset-unviewed and load+mark-viewed compound effects
//! each run inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db;
use crate::error::ProfStoreError;
use crate::models::ProfilerResult;
use crate::storage::{validate_list_args, ListOrder, ResultStorage};

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Wrap an existing pool. The schema must already exist.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect per `config` and bootstrap the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ProfStoreError> {
        let pool = db::create_pool(config).await?;
        db::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResultStorage for PostgresStorage {
    async fn list(
        &self,
        max_results: u32,
        start: Option<DateTime<Utc>>,
        finish: Option<DateTime<Utc>>,
        order: ListOrder,
    ) -> Result<Vec<Uuid>, ProfStoreError> {
        validate_list_args(max_results, start, finish)?;

        let sql = match order {
            ListOrder::Ascending => {
                r#"
                SELECT id
                FROM profiler_results
                WHERE ($2::timestamptz IS NULL OR started_at >= $2)
                  AND ($3::timestamptz IS NULL OR started_at <= $3)
                ORDER BY started_at ASC, id ASC
                LIMIT $1
                "#
            }
            ListOrder::Descending => {
                r#"
                SELECT id
                FROM profiler_results
                WHERE ($2::timestamptz IS NULL OR started_at >= $2)
                  AND ($3::timestamptz IS NULL OR started_at <= $3)
                ORDER BY started_at DESC, id DESC
                LIMIT $1
                "#
            }
        };

        let rows = sqlx::query_as::<_, (Uuid,)>(sql)
            .bind(max_results as i64)
            .bind(start)
            .bind(finish)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn save(&self, result: &ProfilerResult) -> Result<(), ProfStoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO profiler_results (id, name, user_name, machine_name, started_at, duration_ms, root)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                user_name = EXCLUDED.user_name,
                machine_name = EXCLUDED.machine_name,
                started_at = EXCLUDED.started_at,
                duration_ms = EXCLUDED.duration_ms,
                root = EXCLUDED.root
            "#,
        )
        .bind(result.id)
        .bind(&result.name)
        .bind(&result.user)
        .bind(&result.machine_name)
        .bind(result.started_at)
        .bind(result.duration_ms)
        .bind(&result.root)
        .execute(&mut *tx)
        .await?;

        // Presence = unviewed; DO NOTHING keeps the original insertion slot
        sqlx::query(
            r#"
            INSERT INTO profiler_unviewed (user_name, result_id)
            VALUES ($1, $2)
            ON CONFLICT (user_name, result_id) DO NOTHING
            "#,
        )
        .bind(&result.user)
        .bind(result.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(id = %result.id, user = %result.user, "Saved profiler result");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ProfilerResult, ProfStoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query_as::<_, ProfilerResult>(
            r#"
            SELECT id, name, user_name AS "user", machine_name, started_at, duration_ms, root
            FROM profiler_results
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ProfStoreError::NotFound(id))?;

        sqlx::query("DELETE FROM profiler_unviewed WHERE user_name = $1 AND result_id = $2")
            .bind(&result.user)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn set_unviewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiler_unviewed (user_name, result_id)
            VALUES ($1, $2)
            ON CONFLICT (user_name, result_id) DO NOTHING
            "#,
        )
        .bind(user)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_viewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError> {
        sqlx::query("DELETE FROM profiler_unviewed WHERE user_name = $1 AND result_id = $2")
            .bind(user)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unviewed_ids(&self, user: &str) -> Result<Vec<Uuid>, ProfStoreError> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT result_id
            FROM profiler_unviewed
            WHERE user_name = $1
            ORDER BY added_at ASC, result_id ASC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
