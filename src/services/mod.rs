pub mod accounts;
pub mod trips;
