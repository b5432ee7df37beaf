mod common;

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use common::TestState;
use serde_json::json;
use tower::ServiceExt;
use wanderplan::{
    auth::{self, session},
    models::trip::NewTrip,
    routes::create_router,
    state::AppState,
};

const PASSWORD: &str = "sup3rsecret";

struct TestResponse {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

/// Drives the real router and keeps cookies between requests like a
/// browser would.
struct TestClient {
    router: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    fn new(state: &TestState) -> Self {
        Self {
            router: create_router(state.app().clone()),
            cookies: HashMap::new(),
        }
    }

    async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    async fn post_form(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send(Method::POST, uri, Some(form.to_string())).await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form)),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().expect("ascii cookie");
            let pair = raw.split(';').next().unwrap_or_default();
            let (name, value) = pair.split_once('=').expect("cookie pair");
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().expect("ascii location").to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    async fn register(&mut self, username: &str) -> TestResponse {
        self.post_form(
            "/register",
            &format!("username={username}&password={PASSWORD}"),
        )
        .await
    }

    async fn login(&mut self, username: &str) -> TestResponse {
        self.post_form("/login", &format!("username={username}&password={PASSWORD}"))
            .await
    }
}

async fn session_count(app: &AppState) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&app.db)
        .await
        .unwrap()
}

async fn expire_all_sessions(app: &AppState) {
    sqlx::query("UPDATE sessions SET expires_at = ?1")
        .bind(Utc::now() - Duration::hours(1))
        .execute(&app.db)
        .await
        .unwrap();
}

async fn last_seen(app: &AppState, token: &str) -> DateTime<Utc> {
    sqlx::query_scalar("SELECT last_seen_at FROM sessions WHERE id = ?1")
        .bind(token)
        .fetch_one(&app.db)
        .await
        .unwrap()
}

fn trip(location: &str) -> NewTrip {
    NewTrip {
        location: location.into(),
        people: "4".into(),
        money_required: "2000 EUR".into(),
        description: format!("A week in {location}"),
    }
}

#[tokio::test]
async fn landing_page_renders() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    let res = client.get("/").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("Plan trips together"));
}

#[tokio::test]
async fn registering_the_same_username_twice_fails() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);

    let first = client.register("alice").await;
    assert_eq!(first.status, StatusCode::SEE_OTHER);
    assert_eq!(first.location.as_deref(), Some("/login"));

    let second = client.register("alice").await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert!(second.body.contains("That username already exists"));
}

#[tokio::test]
async fn registration_form_reports_length_errors() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);

    let res = client
        .post_form("/register", "username=abc&password=short")
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res
        .body
        .contains("Field must be between 4 and 20 characters long."));
    assert!(res
        .body
        .contains("Field must be between 8 and 20 characters long."));
    assert!(state
        .app()
        .accounts
        .find_by_username("abc")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn login_establishes_a_session() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("bob_the_traveller").await;

    let res = client.login("bob_the_traveller").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/dashboard"));

    let dashboard = client.get("/dashboard").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert!(dashboard.body.contains("Login successful!"));
    assert!(dashboard.body.contains("bob_the_traveller"));

    // the flash is consumed by the first page that shows it
    let again = client.get("/dashboard").await;
    assert!(!again.body.contains("Login successful!"));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("carol").await;

    let res = client
        .post_form("/login", "username=carol&password=not-the-one")
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body.contains("Invalid username or password"));

    let profile = client.get("/profile").await;
    assert_eq!(profile.status, StatusCode::SEE_OTHER);
    assert_eq!(profile.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    for uri in ["/profile", "/dashboard", "/travel", "/trip-details/1"] {
        let res = client.get(uri).await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(res.location.as_deref(), Some("/login"), "{uri}");
    }
}

#[tokio::test]
async fn creating_a_trip_while_anonymous_redirects_without_storing() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);

    let res = client
        .post_form(
            "/dashboard",
            "location=Rome&people=2&money_required=900&description=Pasta",
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/login"));
    assert!(state.app().trips.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn planning_a_trip_from_the_dashboard() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("dora").await;
    client.login("dora").await;

    let res = client
        .post_form(
            "/dashboard",
            "location=Kyoto&people=3&money_required=4500+USD&description=Temples",
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/dashboard"));

    let page = client.get("/dashboard").await;
    assert!(page.body.contains("Trip has been planned successfully!"));
    assert!(page.body.contains("Kyoto"));

    let trips = state.app().trips.list(None).await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].money_required, "4500 USD");
    assert_eq!(trips[0].owner_username, "dora");
}

#[tokio::test]
async fn travel_page_submits_back_to_itself() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("erin").await;
    client.login("erin").await;

    let res = client
        .post_form(
            "/travel",
            "location=Lima&people=1&money_required=800&description=Ceviche",
        )
        .await;
    assert_eq!(res.location.as_deref(), Some("/travel"));
    let page = client.get("/travel").await;
    assert!(page.body.contains("Lima"));
}

#[tokio::test]
async fn incomplete_trip_form_is_rerendered_with_errors() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("frank").await;
    client.login("frank").await;

    let res = client
        .post_form("/dashboard", "location=Cairo&people=&money_required=")
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body.contains("This field is required."));
    assert!(res.body.contains("value=\"Cairo\""));
    assert!(state.app().trips.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_filters_by_location_and_owner() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let gina = auth::register_user(app, "gina", PASSWORD).await.unwrap();
    let hank = auth::register_user(app, "hank", PASSWORD).await.unwrap();
    app.trips.create(gina.id, trip("Reykjavik")).await.unwrap();
    app.trips.create(hank.id, trip("Barcelona")).await.unwrap();
    app.trips.create(hank.id, trip("Berlin")).await.unwrap();

    let mut client = TestClient::new(&state);
    client.login("gina").await;

    let page = client.get("/dashboard?search=reykj").await;
    assert!(page.body.contains("Reykjavik"));
    assert!(!page.body.contains("Barcelona"));
    assert!(!page.body.contains("Berlin"));

    let page = client.get("/travel?search=HANK").await;
    assert!(!page.body.contains("Reykjavik"));
    assert!(page.body.contains("Barcelona"));
    assert!(page.body.contains("Berlin"));
}

#[tokio::test]
async fn trip_details_returns_exact_fields() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let ivy = auth::register_user(app, "ivy_green", PASSWORD).await.unwrap();
    let created = app.trips.create(ivy.id, trip("Hanoi")).await.unwrap();

    let mut client = TestClient::new(&state);
    client.login("ivy_green").await;

    let res = client.get(&format!("/trip-details/{}", created.id)).await;
    assert_eq!(res.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(
        body,
        json!({
            "location": "Hanoi",
            "people": "4",
            "money_required": "2000 EUR",
            "description": "A week in Hanoi",
        })
    );

    let missing = client.get(&format!("/trip-details/{}", created.id + 100)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let garbage = client.get("/trip-details/not-a-number").await;
    assert_eq!(garbage.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_owner_can_delete_a_trip() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let owner = auth::register_user(app, "jules", PASSWORD).await.unwrap();
    auth::register_user(app, "kira", PASSWORD).await.unwrap();
    let created = app.trips.create(owner.id, trip("Quito")).await.unwrap();

    let mut other = TestClient::new(&state);
    other.login("kira").await;
    let res = other
        .post_form(&format!("/delete-trip/{}", created.id), "")
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.trips.get(created.id).await.is_ok());

    let mut client = TestClient::new(&state);
    client.login("jules").await;
    let res = client
        .post_form(&format!("/delete-trip/{}", created.id), "")
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert!(app.trips.get(created.id).await.is_err());

    let again = client
        .post_form(&format!("/delete-trip/{}", created.id), "")
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_shows_account_summary() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let lena = auth::register_user(app, "lena", PASSWORD).await.unwrap();
    app.trips.create(lena.id, trip("Cusco")).await.unwrap();
    app.trips.create(lena.id, trip("Sucre")).await.unwrap();

    let mut client = TestClient::new(&state);
    client.login("lena").await;
    let res = client.get("/profile").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("lena"));
    assert!(res.body.contains("2 trip(s) planned"));
}

#[tokio::test]
async fn logout_tears_down_the_session() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("milo").await;
    client.login("milo").await;
    assert_eq!(client.get("/profile").await.status, StatusCode::OK);

    let res = client.get("/logout").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/"));

    let home = client.get("/").await;
    assert!(home.body.contains("You have been logged out!"));

    let profile = client.get("/profile").await;
    assert_eq!(profile.status, StatusCode::SEE_OTHER);
    assert_eq!(profile.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn registration_success_is_announced_on_the_login_page() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("nina").await;

    let page = client.get("/login").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page
        .body
        .contains("Registration successful! You can now log in."));
}

#[tokio::test]
async fn registration_storage_failure_rolls_back_with_a_generic_message() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    sqlx::query(
        r#"CREATE TRIGGER refuse_accounts BEFORE INSERT ON accounts
           BEGIN SELECT RAISE(ABORT, 'disk on fire'); END"#,
    )
    .execute(&app.db)
    .await
    .unwrap();

    let mut client = TestClient::new(&state);
    let res = client.register("oscar").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res
        .body
        .contains("There was an error with your registration. Please try again."));
    assert!(!res.body.contains("disk on fire"));

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(accounts, 0);
}

#[tokio::test]
async fn trip_details_keep_the_submitted_text() {
    let state = TestState::new().await.unwrap();
    let mut client = TestClient::new(&state);
    client.register("pablo").await;
    client.login("pablo").await;

    let res = client
        .post_form(
            "/dashboard",
            "location=++Oslo+&people=+2&money_required=1500+EUR&description=fjords%0A%0A-+day+1%0A",
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let trips = state.app().trips.list(None).await.unwrap();
    assert_eq!(trips.len(), 1);
    let res = client.get(&format!("/trip-details/{}", trips[0].id)).await;
    let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(
        body,
        json!({
            "location": "  Oslo ",
            "people": " 2",
            "money_required": "1500 EUR",
            "description": "fjords\n\n- day 1\n",
        })
    );
}

#[tokio::test]
async fn expired_session_cookie_is_treated_as_anonymous() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let mut client = TestClient::new(&state);
    client.register("quinn").await;
    client.login("quinn").await;
    assert_eq!(client.get("/profile").await.status, StatusCode::OK);

    expire_all_sessions(app).await;

    let res = client.get("/profile").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/login"));
    assert_eq!(session_count(app).await, 0);
}

#[tokio::test]
async fn expired_session_is_deleted_on_lookup() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    auth::register_user(app, "rosa", PASSWORD).await.unwrap();
    let (_, token) = auth::login(app, "rosa", PASSWORD).await.unwrap();
    assert!(session::find_active(app, &token).await.unwrap().is_some());

    expire_all_sessions(app).await;

    assert!(session::find_active(app, &token).await.unwrap().is_none());
    assert_eq!(session_count(app).await, 0);
}

#[tokio::test]
async fn unknown_or_tampered_session_cookies_are_anonymous() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    let mut client = TestClient::new(&state);
    client.register("sven").await;
    client.login("sven").await;

    // token no longer known to the server
    sqlx::query("DELETE FROM sessions")
        .execute(&app.db)
        .await
        .unwrap();
    let res = client.get("/profile").await;
    assert_eq!(res.location.as_deref(), Some("/login"));

    // cookie that does not decrypt
    client
        .cookies
        .insert(auth::SESSION_COOKIE.to_string(), "forged-token".to_string());
    let res = client.get("/profile").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn last_seen_is_refreshed_only_when_stale() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    auth::register_user(app, "tara", PASSWORD).await.unwrap();
    let (_, token) = auth::login(app, "tara", PASSWORD).await.unwrap();

    let fresh = last_seen(app, &token).await;
    session::find_active(app, &token).await.unwrap();
    assert_eq!(last_seen(app, &token).await, fresh);

    let stale = Utc::now() - Duration::minutes(session::TOUCH_INTERVAL_MINUTES + 1);
    sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2")
        .bind(stale)
        .bind(&token)
        .execute(&app.db)
        .await
        .unwrap();
    session::find_active(app, &token).await.unwrap();
    assert!(last_seen(app, &token).await > stale);
}

#[tokio::test]
async fn login_purges_expired_sessions() {
    let state = TestState::new().await.unwrap();
    let app = state.app();
    auth::register_user(app, "ugo_s", PASSWORD).await.unwrap();
    let (_, old) = auth::login(app, "ugo_s", PASSWORD).await.unwrap();
    auth::login(app, "ugo_s", PASSWORD).await.unwrap();
    expire_all_sessions(app).await;

    let (_, current) = auth::login(app, "ugo_s", PASSWORD).await.unwrap();
    assert_eq!(session_count(app).await, 1);
    assert!(session::find_active(app, &old).await.unwrap().is_none());
    assert!(session::find_active(app, &current).await.unwrap().is_some());
}
