pub mod password;
pub mod session;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::account::Account,
    state::AppState,
    validation::{self, CredentialsForm},
};

pub use session::{create_session, destroy_session};

pub const SESSION_COOKIE: &str = "wanderplan_session";

/// The account bound to the current request's session.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

/// Resolves the session cookie to an account and stores it in the request
/// extensions for [`CurrentUser`]. Unknown or expired tokens leave the
/// request anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match session::find_active(&state, cookie.value()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(err) => warn!("session lookup failed: {err}"),
        }
    }
    next.run(req).await
}

/// Guard for protected routes: anonymous requests go to the login page
/// before any body is read.
pub async fn require_login(req: Request, next: Next) -> Response {
    if req.extensions().get::<AuthenticatedUser>().is_none() {
        return AppError::Unauthorized.into_response();
    }
    next.run(req).await
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Account, AppError> {
    let creds = validation::validate_registration(&CredentialsForm {
        username: username.to_owned(),
        password: password.to_owned(),
    })
    .map_err(AppError::Validation)?;
    let hash = password::hash_password(&creds.password)?;
    let account = state.accounts.create(&creds.username, &hash).await?;
    info!(account_id = account.id, "registered account {}", account.username);
    Ok(account)
}

pub async fn authenticate_user(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Account, AppError> {
    let Some(account) = state.accounts.find_by_username(username).await? else {
        return Err(AppError::InvalidCredentials);
    };
    if !password::verify_password(password, &account.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }
    Ok(account)
}

/// Verifies credentials and opens a session; returns the account and the
/// session token.
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<(Account, String), AppError> {
    let account = authenticate_user(state, username, password).await?;
    let token = create_session(state, account.id).await?;
    info!(account_id = account.id, "login");
    Ok((account, token))
}

pub async fn logout(state: &AppState, token: &str) -> Result<(), AppError> {
    destroy_session(state, token).await?;
    info!("logout");
    Ok(())
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
