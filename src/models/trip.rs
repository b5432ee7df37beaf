use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub location: String,
    pub people: String,
    pub money_required: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub account_id: i64,
}

/// A trip joined with its owner's username, as shown on the listing pages.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TripListing {
    pub id: i64,
    pub location: String,
    pub people: String,
    pub money_required: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub account_id: i64,
    pub owner_username: String,
}

/// Payload of `GET /trip-details/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDetails {
    pub location: String,
    pub people: String,
    pub money_required: String,
    pub description: String,
}

impl From<Trip> for TripDetails {
    fn from(trip: Trip) -> Self {
        Self {
            location: trip.location,
            people: trip.people,
            money_required: trip.money_required,
            description: trip.description,
        }
    }
}

/// Validated input for a new trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrip {
    pub location: String,
    pub people: String,
    pub money_required: String,
    pub description: String,
}
