#![allow(dead_code)]

use std::{fmt, net::SocketAddr};

use anyhow::Context;
use tempfile::TempDir;
use wanderplan::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    state::AppState,
};

/// An application state backed by a throwaway sqlite file.
pub struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    pub async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for test state")?;
        let static_dir = root.path().join("static");
        std::fs::create_dir_all(&static_dir)?;

        let db_path = root.path().join("test.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "test-cookie-secret".into(),
            session_ttl_hours: 1,
            static_dir,
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        let app = AppState::new(config, db);
        Ok(Self { app, _root: root })
    }

    pub fn app(&self) -> &AppState {
        &self.app
    }
}
