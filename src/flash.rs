//! One-shot messages carried across a redirect in a private cookie.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};

const FLASH_COOKIE: &str = "wanderplan_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Danger => "danger",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "danger" => Some(Level::Danger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn level_class(&self) -> &'static str {
        self.level.as_str()
    }
}

pub fn push(jar: PrivateCookieJar, level: Level, message: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, format!("{}|{message}", level.as_str())))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Removes the pending flash (if any) from the jar and returns it.
pub fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

fn decode(raw: &str) -> Option<Flash> {
    let (level, message) = raw.split_once('|')?;
    Some(Flash::new(Level::parse(level)?, message))
}
