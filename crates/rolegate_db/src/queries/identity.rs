//! Bound identity queries.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::models::{Address, BoundIdentity, BoundIdentityRow, MemberId};

/// Bind `address` to `member_id`, replacing the member's previous binding.
///
/// The delete and insert run in one transaction and the UNIQUE constraint on
/// `address` decides conflicts: if another member holds the address the
/// transaction rolls back, leaving both bindings as they were, and
/// [`DbError::AddressTaken`] is returned.
pub async fn bind_identity(
    pool: &SqlitePool,
    member_id: MemberId,
    address: &Address,
    bound_at: i64,
) -> DbResult<()> {
    let member = member_id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM bound_identities WHERE member_id = ?")
        .bind(&member)
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query(
        "INSERT INTO bound_identities (member_id, address, bound_at) VALUES (?, ?, ?)",
    )
    .bind(&member)
    .bind(address.as_str())
    .bind(bound_at)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {
            tx.commit().await?;
            info!("Bound member {} to address {}", member_id, address);
            Ok(())
        }
        Err(e) if DbError::is_unique_violation(&e) => {
            tx.rollback().await?;
            warn!(
                "Member {} tried to bind address {} which is bound to another member",
                member_id, address
            );
            Err(DbError::AddressTaken {
                address: address.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Get the binding for a member.
pub async fn get_bound_identity(
    pool: &SqlitePool,
    member_id: MemberId,
) -> DbResult<Option<BoundIdentity>> {
    let row = sqlx::query_as::<_, BoundIdentityRow>(
        "SELECT member_id, address, bound_at FROM bound_identities WHERE member_id = ?",
    )
    .bind(member_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|r| r.to_identity()).transpose()
}

/// Get the address bound to a member, if any.
pub async fn get_bound_address(pool: &SqlitePool, member_id: MemberId) -> DbResult<Option<Address>> {
    Ok(get_bound_identity(pool, member_id)
        .await?
        .map(|identity| identity.address))
}

/// Find which member holds an address.
pub async fn find_member_by_address(
    pool: &SqlitePool,
    address: &Address,
) -> DbResult<Option<MemberId>> {
    let row = sqlx::query_as::<_, BoundIdentityRow>(
        "SELECT member_id, address, bound_at FROM bound_identities WHERE address = ?",
    )
    .bind(address.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.to_identity()).transpose()?.map(|i| i.member_id))
}

/// Remove a member's binding (logout).
pub async fn delete_bound_identity(pool: &SqlitePool, member_id: MemberId) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM bound_identities WHERE member_id = ?")
        .bind(member_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All members with a binding.
pub async fn list_bound_members(pool: &SqlitePool) -> DbResult<Vec<MemberId>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT member_id FROM bound_identities ORDER BY member_id")
            .fetch_all(pool)
            .await?;

    rows.iter()
        .map(|(id,)| MemberId::parse_column(id))
        .collect()
}

/// Number of bound identities.
pub async fn count_bound_identities(pool: &SqlitePool) -> DbResult<u64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bound_identities")
        .fetch_one(pool)
        .await?;
    Ok(count.0 as u64)
}
