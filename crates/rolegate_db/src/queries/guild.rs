//! Guild configuration queries.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::models::{GuildConfig, GuildConfigRow, GuildId, IdentityStatus, RoleId};
use crate::unix_now;

/// Make sure a config row exists for the guild. Existing rows are untouched.
pub async fn ensure_guild(pool: &SqlitePool, guild_id: GuildId) -> DbResult<()> {
    let now = unix_now();
    let result = sqlx::query(
        r#"
        INSERT INTO guild_configs (guild_id, created_at, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT (guild_id) DO NOTHING
        "#,
    )
    .bind(guild_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!("Added guild {} to the database", guild_id);
    }
    Ok(())
}

/// Get a guild's configuration, creating an empty one on first reference.
pub async fn get_guild_config(pool: &SqlitePool, guild_id: GuildId) -> DbResult<GuildConfig> {
    ensure_guild(pool, guild_id).await?;

    let row = sqlx::query_as::<_, GuildConfigRow>(
        r#"
        SELECT guild_id, undefined_role_id, newbie_role_id, verified_role_id,
               human_role_id, suspended_role_id, zombie_role_id, manager_role_id
        FROM guild_configs
        WHERE guild_id = ?
        "#,
    )
    .bind(guild_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => row.to_config(),
        // removed concurrently between the ensure and the select
        None => Ok(GuildConfig::empty(guild_id)),
    }
}

/// Bind a role to one status bucket.
pub async fn set_status_role(
    pool: &SqlitePool,
    guild_id: GuildId,
    status: IdentityStatus,
    role_id: RoleId,
) -> DbResult<()> {
    ensure_guild(pool, guild_id).await?;

    // column name comes from a closed enum, never from user input
    let sql = format!(
        "UPDATE guild_configs SET {} = ?, updated_at = ? WHERE guild_id = ?",
        status.role_column()
    );
    sqlx::query(&sql)
        .bind(role_id.to_string())
        .bind(unix_now())
        .bind(guild_id.to_string())
        .execute(pool)
        .await?;

    info!(
        "Bound role {} to status {} in guild {}",
        role_id, status, guild_id
    );
    Ok(())
}

/// Set the role that grants operator command access.
pub async fn set_manager_role(
    pool: &SqlitePool,
    guild_id: GuildId,
    role_id: RoleId,
) -> DbResult<()> {
    ensure_guild(pool, guild_id).await?;

    sqlx::query("UPDATE guild_configs SET manager_role_id = ?, updated_at = ? WHERE guild_id = ?")
        .bind(role_id.to_string())
        .bind(unix_now())
        .bind(guild_id.to_string())
        .execute(pool)
        .await?;

    info!("Set manager role {} in guild {}", role_id, guild_id);
    Ok(())
}

/// All guilds with a config row.
pub async fn list_guilds(pool: &SqlitePool) -> DbResult<Vec<GuildId>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT guild_id FROM guild_configs ORDER BY guild_id")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|(id,)| GuildId::parse_column(id))
        .collect()
}

/// Remove a guild's configuration (bot removed from the guild).
pub async fn delete_guild(pool: &SqlitePool, guild_id: GuildId) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM guild_configs WHERE guild_id = ?")
        .bind(guild_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        info!("Removed guild {} from the database", guild_id);
    }
    Ok(result.rows_affected() > 0)
}
