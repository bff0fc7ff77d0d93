//! Refresh token storage for rotation and revocation.
//!
//! One row per outstanding refresh token. Access tokens are stateless and
//! never stored. A deleted row is gone for good, which is what makes a
//! refresh token single-use.

use sqlx::sqlite::SqlitePool;

/// An outstanding refresh token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub created_at: String,
}

/// Store for managing outstanding refresh tokens.
#[derive(Clone)]
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: i64,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(token)
                .bind(expires_at)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Whether a live (unexpired as of `now`) row exists for this exact token and user.
    pub async fn exists(&self, token: &str, user_id: i64, now: i64) -> Result<bool, sqlx::Error> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM refresh_tokens WHERE token = ? AND user_id = ? AND expires_at > ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    /// Get a token row regardless of expiry.
    pub async fn get(&self, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_id, token, expires_at, created_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a token (revoke). Deleting a missing token is not an error.
    pub async fn delete(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically consume `old_token` and record `new_token` in its place.
    ///
    /// Returns `Ok(false)` without changing anything if `old_token` has no live
    /// row for `user_id` (already consumed, revoked or expired). Any error rolls
    /// the whole transaction back, leaving `old_token` valid.
    pub async fn rotate(
        &self,
        old_token: &str,
        user_id: i64,
        new_token: &str,
        new_expires_at: i64,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM refresh_tokens WHERE token = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(old_token)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(new_token)
            .bind(new_expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Delete all tokens that expired on or before `now`.
    pub async fn delete_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count live tokens for a user.
    pub async fn count_by_user(&self, user_id: i64, now: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ? AND expires_at > ?",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
