//! Pending login queries.

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::models::{Address, MemberId, PendingAuth, PendingAuthRow};

/// Create the pending login for a requester, replacing any previous one.
///
/// A single upsert keyed on the requester, so two racing logins for the same
/// member leave exactly one row behind (the later token).
pub async fn upsert_pending_auth(
    pool: &SqlitePool,
    requester_id: MemberId,
    session_token: &str,
    created_at: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_auth (requester_id, session_token, claimed_address, nonce, created_at)
        VALUES (?, ?, NULL, NULL, ?)
        ON CONFLICT (requester_id) DO UPDATE SET
            session_token = excluded.session_token,
            claimed_address = NULL,
            nonce = NULL,
            created_at = excluded.created_at
        "#,
    )
    .bind(requester_id.to_string())
    .bind(session_token)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Attach a nonce and claimed address to a pending login.
///
/// Returns `false` if no row holds the token.
pub async fn set_pending_challenge(
    pool: &SqlitePool,
    session_token: &str,
    address: &Address,
    nonce: &str,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE pending_auth SET claimed_address = ?, nonce = ? WHERE session_token = ?",
    )
    .bind(address.as_str())
    .bind(nonce)
    .bind(session_token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Look up a pending login by token.
pub async fn get_pending_auth(
    pool: &SqlitePool,
    session_token: &str,
) -> DbResult<Option<PendingAuth>> {
    let row = sqlx::query_as::<_, PendingAuthRow>(
        r#"
        SELECT session_token, requester_id, claimed_address, nonce, created_at
        FROM pending_auth
        WHERE session_token = ?
        "#,
    )
    .bind(session_token)
    .fetch_optional(pool)
    .await?;

    row.map(|r| r.to_pending()).transpose()
}

/// Delete a pending login. Deleting a missing token is not an error.
pub async fn delete_pending_auth(pool: &SqlitePool, session_token: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM pending_auth WHERE session_token = ?")
        .bind(session_token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete pending logins created before `cutoff` (unix seconds).
pub async fn delete_pending_auth_before(pool: &SqlitePool, cutoff: i64) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM pending_auth WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
