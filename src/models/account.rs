use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A registered identity. `password_hash` is a PHC string and is never
/// serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
