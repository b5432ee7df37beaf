use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    auth::{self, AuthenticatedUser, CurrentUser},
    error::AppError,
    flash::{self, Flash, Level},
    models::trip::{TripDetails, TripListing},
    routes::{format_timestamp, Layout},
    state::AppState,
    validation::{self, FieldErrors, TripForm},
};

const TRIP_SAVE_FAILED: &str = "There was an error planning your trip. Please try again.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/dashboard", get(dashboard).post(dashboard_submit))
        .route("/travel", get(travel).post(travel_submit))
        .route("/trip-details/:id", get(trip_details))
        .route("/delete-trip/:id", post(delete_trip))
        .route_layer(middleware::from_fn(auth::require_login))
}

#[derive(Template)]
#[template(path = "user/profile.html")]
struct ProfileTemplate {
    layout: Layout,
    username: String,
    member_since: String,
    trip_count: i64,
}

async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let account = state
        .accounts
        .find_by_id(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let trip_count = state.trips.count_for_account(account.id).await?;
    let (jar, flash) = flash::take(jar);
    Ok((
        jar,
        AskamaTemplateResponse::into_response(ProfileTemplate {
            layout: Layout::new(true, flash),
            username: account.username,
            member_since: format_timestamp(account.created_at),
            trip_count,
        }),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    search: Option<String>,
}

#[derive(Clone)]
struct TripRow {
    id: i64,
    location: String,
    people: String,
    money_required: String,
    description: String,
    owner_username: String,
    created_at: String,
    owned_by_viewer: bool,
}

impl TripRow {
    fn from_listing(listing: TripListing, viewer_id: i64) -> Self {
        Self {
            id: listing.id,
            owned_by_viewer: listing.account_id == viewer_id,
            location: listing.location,
            people: listing.people,
            money_required: listing.money_required,
            description: listing.description,
            owner_username: listing.owner_username,
            created_at: format_timestamp(listing.created_at),
        }
    }
}

/// Everything the trip listing pages show: the (optionally filtered) trips,
/// the search box and the "plan your trip" form.
struct TripsPage {
    action: &'static str,
    username: String,
    search: String,
    trips: Vec<TripRow>,
    form: TripForm,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "user/dashboard.html")]
struct DashboardTemplate {
    layout: Layout,
    page: TripsPage,
}

#[derive(Template)]
#[template(path = "user/travel.html")]
struct TravelTemplate {
    layout: Layout,
    page: TripsPage,
}

/// The two pages listing trips. They behave identically and differ only in
/// presentation and in where a successful submission lands.
#[derive(Debug, Clone, Copy)]
enum TripsView {
    Dashboard,
    Travel,
}

impl TripsView {
    fn path(self) -> &'static str {
        match self {
            TripsView::Dashboard => "/dashboard",
            TripsView::Travel => "/travel",
        }
    }

    fn render(self, layout: Layout, page: TripsPage) -> Response {
        match self {
            TripsView::Dashboard => {
                AskamaTemplateResponse::into_response(DashboardTemplate { layout, page })
            }
            TripsView::Travel => AskamaTemplateResponse::into_response(TravelTemplate { layout, page }),
        }
    }
}

async fn load_page(
    state: &AppState,
    view: TripsView,
    user: &AuthenticatedUser,
    search: Option<String>,
    form: TripForm,
    errors: FieldErrors,
) -> Result<TripsPage, AppError> {
    let listings = state.trips.list(search.as_deref()).await?;
    Ok(TripsPage {
        action: view.path(),
        username: user.username.clone(),
        search: search.unwrap_or_default(),
        trips: listings
            .into_iter()
            .map(|listing| TripRow::from_listing(listing, user.id))
            .collect(),
        form,
        errors,
    })
}

async fn show_trips(
    state: AppState,
    current: CurrentUser,
    jar: PrivateCookieJar,
    params: SearchParams,
    view: TripsView,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let page = load_page(
        &state,
        view,
        user,
        params.search,
        TripForm::default(),
        FieldErrors::new(),
    )
    .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, view.render(Layout::new(true, flash), page)).into_response())
}

async fn submit_trip(
    state: AppState,
    current: CurrentUser,
    jar: PrivateCookieJar,
    params: SearchParams,
    form: TripForm,
    view: TripsView,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let new_trip = match validation::validate_trip(&form) {
        Ok(trip) => trip,
        Err(errors) => {
            let page = load_page(&state, view, user, params.search, form, errors).await?;
            return Ok((
                StatusCode::BAD_REQUEST,
                view.render(Layout::new(true, None), page),
            )
                .into_response());
        }
    };

    match state.trips.create(user.id, new_trip).await {
        Ok(trip) => {
            info!(trip_id = trip.id, account_id = user.id, "trip planned");
            let jar = flash::push(jar, Level::Success, "Trip has been planned successfully!");
            Ok((jar, Redirect::to(view.path())).into_response())
        }
        Err(err) => {
            error!("saving trip failed: {err}");
            let page =
                load_page(&state, view, user, params.search, form, FieldErrors::new()).await?;
            let layout = Layout::new(true, Some(Flash::new(Level::Danger, TRIP_SAVE_FAILED)));
            Ok((StatusCode::INTERNAL_SERVER_ERROR, view.render(layout, page)).into_response())
        }
    }
}

async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    show_trips(state, current, jar, params, TripsView::Dashboard).await
}

async fn dashboard_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Query(params): Query<SearchParams>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    submit_trip(state, current, jar, params, form, TripsView::Dashboard).await
}

async fn travel(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    show_trips(state, current, jar, params, TripsView::Travel).await
}

async fn travel_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Query(params): Query<SearchParams>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    submit_trip(state, current, jar, params, form, TripsView::Travel).await
}

/// Ids that are not integers can't name a trip, so they are a 404 too.
fn parse_trip_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

async fn trip_details(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<Json<TripDetails>, AppError> {
    current.require_user()?;
    let trip = state.trips.get(parse_trip_id(&raw_id)?).await?;
    Ok(Json(trip.into()))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(raw_id): Path<String>,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let user = current.require_user()?;
    let trip_id = parse_trip_id(&raw_id)?;
    state.trips.delete(user.id, trip_id).await?;
    info!(trip_id, account_id = user.id, "trip deleted");
    Ok((
        flash::push(jar, Level::Info, "Trip deleted."),
        Redirect::to(TripsView::Dashboard.path()),
    ))
}
