//! Provider-response cache backed by the `api_cache` table.
//!
//! Keyed on `(ticker, endpoint)`. Reads ignore expired rows; writes upsert,
//! so at most one live row exists per key. There is no request coalescing:
//! two concurrent misses both fetch upstream and the later write wins.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
}

impl ResponseCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the cached payload for a key, if a live row exists.
    pub async fn get(&self, ticker: &str, endpoint: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM api_cache WHERE ticker = ? AND endpoint = ? AND expires_at > ?",
        )
        .bind(ticker)
        .bind(endpoint)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Store a payload with the given time-to-live, replacing any previous
    /// row for the key.
    pub async fn put(&self, ticker: &str, endpoint: &str, data: &Value, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO api_cache (ticker, endpoint, data, fetched_at, expires_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (ticker, endpoint) DO UPDATE SET \
             data = excluded.data, fetched_at = excluded.fetched_at, expires_at = excluded.expires_at",
        )
        .bind(ticker)
        .bind(endpoint)
        .bind(serde_json::to_string(data)?)
        .bind(now.to_rfc3339())
        .bind((now + ttl).to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete rows past their expiry. Returns the number removed.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM api_cache WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DashboardDb;
    use serde_json::json;

    async fn test_cache() -> ResponseCache {
        let db = DashboardDb::new("sqlite::memory:").await.unwrap();
        ResponseCache::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_get_after_put_returns_identical_payload() {
        let cache = test_cache().await;
        let payload = json!({ "symbol": "AAPL", "price": 182.52, "volume": 48_210_000 });

        cache.put("AAPL", "quote", &payload, Duration::hours(24)).await.unwrap();
        let cached = cache.get("AAPL", "quote").await.unwrap();

        assert_eq!(cached, Some(payload));
    }

    #[tokio::test]
    async fn test_expired_rows_are_missed() {
        let cache = test_cache().await;
        let payload = json!({ "price": 1.0 });

        cache.put("AAPL", "quote", &payload, Duration::seconds(-1)).await.unwrap();

        assert_eq!(cache.get("AAPL", "quote").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_row() {
        let cache = test_cache().await;

        cache.put("AAPL", "quote", &json!({ "price": 1.0 }), Duration::hours(1)).await.unwrap();
        cache.put("AAPL", "quote", &json!({ "price": 2.0 }), Duration::hours(1)).await.unwrap();

        let cached = cache.get("AAPL", "quote").await.unwrap().unwrap();
        assert_eq!(cached["price"], 2.0);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_cache")
            .fetch_one(&cache.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_endpoint() {
        let cache = test_cache().await;

        cache.put("AAPL", "quote", &json!({ "kind": "quote" }), Duration::hours(1)).await.unwrap();
        cache.put("AAPL", "ratios:annual:20", &json!({ "kind": "ratios" }), Duration::hours(1)).await.unwrap();

        let quote = cache.get("AAPL", "quote").await.unwrap().unwrap();
        assert_eq!(quote["kind"], "quote");
        assert_eq!(cache.get("MSFT", "quote").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_rows() {
        let cache = test_cache().await;

        cache.put("AAPL", "quote", &json!(1), Duration::seconds(-1)).await.unwrap();
        cache.put("MSFT", "quote", &json!(2), Duration::hours(1)).await.unwrap();

        assert_eq!(cache.sweep_expired().await.unwrap(), 1);
        assert!(cache.get("MSFT", "quote").await.unwrap().is_some());
    }
}
