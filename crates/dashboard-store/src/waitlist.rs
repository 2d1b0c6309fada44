//! Waitlist signups.

use anyhow::Result;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Waitlist {
    pool: SqlitePool,
}

impl Waitlist {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a signup. Returns false when the address was already present.
    pub async fn add(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        let result = sqlx::query("INSERT OR IGNORE INTO waitlist_emails (email) VALUES (?)")
            .bind(&email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM waitlist_emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DashboardDb;

    #[tokio::test]
    async fn test_duplicate_signup_is_a_no_op() {
        let db = DashboardDb::new("sqlite::memory:").await.unwrap();
        let waitlist = Waitlist::new(db.pool().clone());

        assert!(waitlist.add("investor@example.com").await.unwrap());
        assert!(!waitlist.add("Investor@Example.com ").await.unwrap());
        assert_eq!(waitlist.count().await.unwrap(), 1);
    }
}
