//! SQLite store
//!
//! Tables are created on connect. Counter increments for one call run in a
//! single transaction.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;

use super::{CounterStore, ScoredSetStore};
use crate::error::Result;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Connect and create tables
    ///
    /// In-memory databases (`sqlite::memory:`) are pinned to one connection,
    /// otherwise every pooled connection would see its own empty database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // An in-memory database lives only as long as its one connection
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        let db = options.connect(database_url).await?;

        let store = Self { db };
        store.init_db().await?;

        info!("SQLite store ready at {}", database_url);
        Ok(store)
    }

    /// Initialize database tables
    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scored_members (
                set_key TEXT NOT NULL,
                member TEXT NOT NULL,
                score INTEGER NOT NULL,
                PRIMARY KEY (set_key, member)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_scored_members_score
            ON scored_members (set_key, score)
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                counter_key TEXT NOT NULL,
                field TEXT NOT NULL,
                value INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (counter_key, field)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ScoredSetStore for SqliteStore {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scored_members (set_key, member, score) VALUES (?, ?, ?)
            ON CONFLICT(set_key, member) DO UPDATE SET score = excluded.score
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn count_between(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM scored_members WHERE set_key = ? AND score >= ? AND score <= ?",
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .fetch_one(&self.db)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn remove_below(&self, key: &str, floor: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM scored_members WHERE set_key = ? AND score < ?")
            .bind(key)
            .bind(floor)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CounterStore for SqliteStore {
    async fn increment(&self, key: &str, fields: &[&str]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        for field in fields {
            sqlx::query(
                r#"
                INSERT INTO counters (counter_key, field, value) VALUES (?, ?, 1)
                ON CONFLICT(counter_key, field) DO UPDATE SET value = value + 1
                "#,
            )
            .bind(key)
            .bind(*field)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT field, value FROM counters WHERE counter_key = ?",
        )
        .bind(key)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
