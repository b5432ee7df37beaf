use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::error;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    flash::{self, Flash, Level},
    routes::Layout,
    state::AppState,
    validation::{self, CredentialsForm, FieldErrors},
};

const REGISTRATION_FAILED: &str =
    "There was an error with your registration. Please try again.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login_form).post(login_submit))
        .route("/register", get(register_form).post(register_submit))
        .route("/logout", get(logout))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    layout: Layout,
}

async fn landing(current: CurrentUser, jar: PrivateCookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        AskamaTemplateResponse::into_response(LandingTemplate {
            layout: Layout::new(current.0.is_some(), flash),
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    layout: Layout,
    username: String,
    errors: FieldErrors,
}

async fn login_form(current: CurrentUser, jar: PrivateCookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        AskamaTemplateResponse::into_response(LoginTemplate {
            layout: Layout::new(current.0.is_some(), flash),
            username: String::new(),
            errors: FieldErrors::new(),
        }),
    )
        .into_response()
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let creds = match validation::validate_login(&form) {
        Ok(creds) => creds,
        Err(errors) => return Ok(render_login_error(jar, form.username, errors, None)),
    };

    match auth::login(&state, &creds.username, &creds.password).await {
        Ok((_, session_id)) => {
            let jar = auth::apply_session_cookie(jar, &session_id);
            let jar = flash::push(jar, Level::Success, "Login successful!");
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        Err(err @ AppError::InvalidCredentials) => Ok(render_login_error(
            jar,
            creds.username,
            FieldErrors::new(),
            Some(Flash::new(Level::Danger, err.to_string())),
        )),
        Err(err) => Err(err),
    }
}

fn render_login_error(
    jar: PrivateCookieJar,
    username: String,
    errors: FieldErrors,
    flash: Option<Flash>,
) -> Response {
    (
        StatusCode::BAD_REQUEST,
        jar,
        AskamaTemplateResponse::into_response(LoginTemplate {
            layout: Layout::new(false, flash),
            username,
            errors,
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    layout: Layout,
    username: String,
    errors: FieldErrors,
}

async fn register_form(current: CurrentUser, jar: PrivateCookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (
        jar,
        AskamaTemplateResponse::into_response(RegisterTemplate {
            layout: Layout::new(current.0.is_some(), flash),
            username: String::new(),
            errors: FieldErrors::new(),
        }),
    )
        .into_response()
}

async fn register_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let creds = match validation::validate_registration(&form) {
        Ok(creds) => creds,
        Err(errors) => {
            return render_register_error(jar, form.username, errors, None, StatusCode::BAD_REQUEST)
        }
    };

    match auth::register_user(&state, &creds.username, &creds.password).await {
        Ok(_) => {
            let jar = flash::push(
                jar,
                Level::Success,
                "Registration successful! You can now log in.",
            );
            (jar, Redirect::to("/login")).into_response()
        }
        Err(err @ AppError::DuplicateUsername) => {
            let mut errors = FieldErrors::new();
            errors.push("username", err.to_string());
            render_register_error(jar, creds.username, errors, None, StatusCode::BAD_REQUEST)
        }
        Err(err) => {
            error!("registration failed: {err}");
            render_register_error(
                jar,
                creds.username,
                FieldErrors::new(),
                Some(Flash::new(Level::Danger, REGISTRATION_FAILED)),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

fn render_register_error(
    jar: PrivateCookieJar,
    username: String,
    errors: FieldErrors,
    flash: Option<Flash>,
    status: StatusCode,
) -> Response {
    (
        status,
        jar,
        AskamaTemplateResponse::into_response(RegisterTemplate {
            layout: Layout::new(false, flash),
            username,
            errors,
        }),
    )
        .into_response()
}

async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let jar = match current.0 {
        Some(user) => {
            auth::logout(&state, &user.session_id).await?;
            flash::push(jar, Level::Info, "You have been logged out!")
        }
        None => jar,
    };
    Ok((auth::clear_session_cookie(jar), Redirect::to("/")))
}
