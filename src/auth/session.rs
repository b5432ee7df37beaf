use chrono::{Duration, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{error::AppError, models::session::Session, state::AppState};

use super::AuthenticatedUser;

/// How stale `last_seen_at` may get before a request refreshes it.
pub const TOUCH_INTERVAL_MINUTES: i64 = 5;

/// Opens a session for `account_id` and returns its token. Sessions that
/// have already expired are purged first.
pub async fn create_session(state: &AppState, account_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = Duration::try_hours(state.config.session_ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Config(format!(
                "session ttl of {} hours is out of range",
                state.config.session_ttl_hours
            ))
        })?;
    let session = Session {
        id: Uuid::new_v4().to_string(),
        account_id,
        created_at: now,
        last_seen_at: now,
        expires_at,
    };

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
        .bind(now)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"INSERT INTO sessions (id, account_id, created_at, last_seen_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
    )
    .bind(&session.id)
    .bind(session.account_id)
    .bind(session.created_at)
    .bind(session.last_seen_at)
    .bind(session.expires_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(session.id)
}

/// Looks up a live session by token. Expired sessions are deleted and
/// resolve to `None`.
pub async fn find_active(
    state: &AppState,
    token: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let row = sqlx::query(
        r#"SELECT s.id, s.account_id, s.created_at, s.last_seen_at, s.expires_at, a.username
           FROM sessions s
           JOIN accounts a ON a.id = s.account_id
           WHERE s.id = ?1"#,
    )
    .bind(token)
    .fetch_optional(&state.db)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let session = Session {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        created_at: row.try_get("created_at")?,
        last_seen_at: row.try_get("last_seen_at")?,
        expires_at: row.try_get("expires_at")?,
    };
    let now = Utc::now();
    if session.is_expired(now) {
        destroy_session(state, &session.id).await?;
        return Ok(None);
    }

    if now - session.last_seen_at >= Duration::minutes(TOUCH_INTERVAL_MINUTES) {
        sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&session.id)
            .execute(&state.db)
            .await?;
    }

    Ok(Some(AuthenticatedUser {
        id: session.account_id,
        username: row.try_get("username")?,
        session_id: session.id,
    }))
}

pub async fn destroy_session(state: &AppState, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(token)
        .execute(&state.db)
        .await?;
    Ok(())
}
