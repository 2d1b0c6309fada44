//! Peer/competitor records keyed by subject symbol.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A subject company and its comparable tickers. Written wholesale by the
/// screener, the LLM regenerator, or manual edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub peers: Vec<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PeerStore {
    pool: SqlitePool,
}

type PeerRow = (String, Option<String>, String, Option<String>, Option<String>, String);

impl PeerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the record for a symbol. Symbols are upper-cased and
    /// the subject is never stored among its own peers.
    pub async fn upsert(&self, record: &PeerRecord) -> Result<PeerRecord> {
        let symbol = record.symbol.trim().to_uppercase();
        let mut peers: Vec<String> = Vec::new();
        for peer in &record.peers {
            let ticker = peer.trim().to_uppercase();
            if ticker.is_empty() || ticker == symbol || peers.contains(&ticker) {
                continue;
            }
            peers.push(ticker);
        }

        let updated_at = Utc::now();
        sqlx::query(
            "INSERT INTO stock_peers (symbol, name, peers, sector, industry, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (symbol) DO UPDATE SET \
             name = excluded.name, peers = excluded.peers, sector = excluded.sector, \
             industry = excluded.industry, updated_at = excluded.updated_at",
        )
        .bind(&symbol)
        .bind(&record.name)
        .bind(serde_json::to_string(&peers)?)
        .bind(&record.sector)
        .bind(&record.industry)
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(PeerRecord {
            symbol,
            name: record.name.clone(),
            peers,
            sector: record.sector.clone(),
            industry: record.industry.clone(),
            updated_at,
        })
    }

    pub async fn get(&self, symbol: &str) -> Result<Option<PeerRecord>> {
        let row: Option<PeerRow> = sqlx::query_as(
            "SELECT symbol, name, peers, sector, industry, updated_at \
             FROM stock_peers WHERE symbol = ?",
        )
        .bind(symbol.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(decode_row))
    }

    /// List records, optionally filtered by a symbol/name substring.
    pub async fn search(&self, query: Option<&str>, limit: i64, offset: i64) -> Result<Vec<PeerRecord>> {
        let rows: Vec<PeerRow> = match query {
            Some(q) => {
                let pattern = format!("%{}%", q.trim());
                sqlx::query_as(
                    "SELECT symbol, name, peers, sector, industry, updated_at \
                     FROM stock_peers \
                     WHERE symbol LIKE ? OR name LIKE ? \
                     ORDER BY symbol LIMIT ? OFFSET ?",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT symbol, name, peers, sector, industry, updated_at \
                     FROM stock_peers ORDER BY symbol LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(decode_row).collect())
    }

    /// Remove a record. Returns false when no row existed.
    pub async fn delete(&self, symbol: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stock_peers WHERE symbol = ?")
            .bind(symbol.trim().to_uppercase())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stock_peers")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

fn decode_row((symbol, name, peers, sector, industry, updated_at): PeerRow) -> PeerRecord {
    PeerRecord {
        symbol,
        name,
        peers: serde_json::from_str(&peers).unwrap_or_default(),
        sector,
        industry,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DashboardDb;

    async fn test_store() -> PeerStore {
        let db = DashboardDb::new("sqlite::memory:").await.unwrap();
        PeerStore::new(db.pool().clone())
    }

    fn record(symbol: &str, peers: &[&str]) -> PeerRecord {
        PeerRecord {
            symbol: symbol.to_string(),
            name: Some("Microsoft".to_string()),
            peers: peers.iter().map(|s| s.to_string()).collect(),
            sector: Some("Technology".to_string()),
            industry: Some("Software".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_uppercases_and_roundtrips() {
        let store = test_store().await;
        store.upsert(&record("msft", &["AAPL", "googl"])).await.unwrap();

        let found = store.get("MSFT").await.unwrap().unwrap();
        assert_eq!(found.symbol, "MSFT");
        assert_eq!(found.peers, vec!["AAPL", "GOOGL"]);

        let matches = store.search(Some("MSFT"), 10, 0).await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_subject_never_among_its_own_peers() {
        let store = test_store().await;
        let saved = store.upsert(&record("MSFT", &["msft", "AAPL", "MSFT"])).await.unwrap();
        assert_eq!(saved.peers, vec!["AAPL"]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_wholesale() {
        let store = test_store().await;
        store.upsert(&record("MSFT", &["AAPL", "GOOGL"])).await.unwrap();
        store.upsert(&record("MSFT", &["ORCL"])).await.unwrap();

        let found = store.get("MSFT").await.unwrap().unwrap();
        assert_eq!(found.peers, vec!["ORCL"]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = test_store().await;
        store.upsert(&record("MSFT", &[])).await.unwrap();

        assert!(store.delete("msft").await.unwrap());
        assert!(!store.delete("msft").await.unwrap());
        assert!(store.get("MSFT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_paginates() {
        let store = test_store().await;
        for symbol in ["AAPL", "AMZN", "GOOGL", "MSFT"] {
            store.upsert(&record(symbol, &[])).await.unwrap();
        }

        let page = store.search(None, 2, 2).await.unwrap();
        let symbols: Vec<&str> = page.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GOOGL", "MSFT"]);
    }
}
