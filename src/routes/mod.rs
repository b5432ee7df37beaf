pub mod public;
pub mod user;

use axum::{middleware, Router};
use chrono::{DateTime, Local, Utc};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{auth, flash::Flash, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .merge(public::router())
        .merge(user::router())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Page chrome shared by every template: navigation state and the pending
/// flash message.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub logged_in: bool,
    pub flash: Option<Flash>,
}

impl Layout {
    pub fn new(logged_in: bool, flash: Option<Flash>) -> Self {
        Self { logged_in, flash }
    }

    pub fn has_flash(&self) -> bool {
        self.flash.is_some()
    }

    pub fn flash_level(&self) -> &str {
        self.flash.as_ref().map(Flash::level_class).unwrap_or("")
    }

    pub fn flash_message(&self) -> &str {
        self.flash
            .as_ref()
            .map(|flash| flash.message.as_str())
            .unwrap_or("")
    }
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%d.%m.%Y %H:%M")
        .to_string()
}
