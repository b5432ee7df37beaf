use chrono::Utc;
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{NewTrip, Trip, TripListing},
};

const LISTING_SELECT: &str = r#"SELECT t.id, t.location, t.people, t.money_required, t.description,
       t.created_at, t.account_id, a.username AS owner_username
FROM trips t
JOIN accounts a ON a.id = t.account_id"#;

#[derive(Clone)]
pub struct TripService {
    db: DbPool,
}

impl TripService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// All trips in insertion order, or only those whose location or owner
    /// username contains `search` (case-insensitive, matched literally). An
    /// empty term lists everything; whitespace is a real filter.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<TripListing>, AppError> {
        let term = search.filter(|term| !term.is_empty());
        let trips = match term {
            Some(term) => {
                debug!("searching trips for {term:?}");
                let sql = format!(
                    r"{LISTING_SELECT}
WHERE t.location LIKE ?1 ESCAPE '\' OR a.username LIKE ?1 ESCAPE '\'
ORDER BY t.id"
                );
                sqlx::query_as::<_, TripListing>(&sql)
                    .bind(like_pattern(term))
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                let sql = format!("{LISTING_SELECT}\nORDER BY t.id");
                sqlx::query_as::<_, TripListing>(&sql)
                    .fetch_all(&self.db)
                    .await?
            }
        };
        Ok(trips)
    }

    pub async fn create(&self, owner_id: i64, trip: NewTrip) -> Result<Trip, AppError> {
        let created = sqlx::query_as::<_, Trip>(
            r#"INSERT INTO trips (location, people, money_required, description, created_at, account_id)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               RETURNING id, location, people, money_required, description, created_at, account_id"#,
        )
        .bind(trip.location)
        .bind(trip.people)
        .bind(trip.money_required)
        .bind(trip.description)
        .bind(Utc::now())
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Trip, AppError> {
        sqlx::query_as::<_, Trip>(
            r#"SELECT id, location, people, money_required, description, created_at, account_id
               FROM trips WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    /// Deletes a trip on behalf of `owner_id`; other accounts' trips are
    /// off limits.
    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<(), AppError> {
        let trip = self.get(id).await?;
        if trip.account_id != owner_id {
            return Err(AppError::Forbidden);
        }
        sqlx::query("DELETE FROM trips WHERE id = ?1 AND account_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn count_for_account(&self, account_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM trips WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

/// Wraps `term` in `%...%` with LIKE wildcards escaped so user input is
/// matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
