use chrono::Utc;

use crate::{db::DbPool, error::AppError, models::account::Account};

#[derive(Clone)]
pub struct AccountService {
    db: DbPool,
}

impl AccountService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, created_at FROM accounts WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, created_at FROM accounts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    /// Inserts a new account inside a single transaction. The existence check
    /// gives the friendly error in the common case; the UNIQUE index catches
    /// the concurrent one.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<Account, AppError> {
        let mut tx = self.db.begin().await?;

        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?1")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(AppError::DuplicateUsername);
        }

        let inserted = sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (username, password_hash, created_at)
               VALUES (?1, ?2, ?3)
               RETURNING id, username, password_hash, created_at"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let account = match inserted {
            Ok(account) => account,
            Err(err) if AppError::is_unique_violation(&err) => {
                return Err(AppError::DuplicateUsername)
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;
        Ok(account)
    }
}
