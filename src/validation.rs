//! Input checks for the registration, login and trip forms.
//!
//! Every check runs and all failures are collected, so a form can be
//! re-rendered with each problem next to its field. Nothing in here touches
//! storage; the "username already taken" rule is enforced by
//! [`crate::auth::register_user`] at write time.

use std::fmt;

use serde::Deserialize;

use crate::models::trip::NewTrip;

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 20;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|err| err.field == field)
    }

    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|err| err.field == field)
            .map(|err| err.message.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

/// Raw username/password submission, shared by the login and register forms.
/// Missing fields deserialize as empty strings so they surface as
/// "required" errors rather than extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripForm {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub people: String,
    #[serde(default)]
    pub money_required: String,
    #[serde(default)]
    pub description: String,
}

pub fn validate_registration(form: &CredentialsForm) -> Result<Credentials, FieldErrors> {
    validate_credentials(form)
}

pub fn validate_login(form: &CredentialsForm) -> Result<Credentials, FieldErrors> {
    validate_credentials(form)
}

fn validate_credentials(form: &CredentialsForm) -> Result<Credentials, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_length(
        &mut errors,
        "username",
        &form.username,
        USERNAME_MIN,
        USERNAME_MAX,
    );
    check_length(
        &mut errors,
        "password",
        &form.password,
        PASSWORD_MIN,
        PASSWORD_MAX,
    );
    errors.into_result(Credentials {
        username: form.username.clone(),
        password: form.password.clone(),
    })
}

pub fn validate_trip(form: &TripForm) -> Result<NewTrip, FieldErrors> {
    let mut errors = FieldErrors::new();
    let location = required(&mut errors, "location", &form.location);
    let people = required(&mut errors, "people", &form.people);
    let money_required = required(&mut errors, "money_required", &form.money_required);
    let description = required(&mut errors, "description", &form.description);
    errors.into_result(NewTrip {
        location,
        people,
        money_required,
        description,
    })
}

fn check_length(errors: &mut FieldErrors, field: &'static str, value: &str, min: usize, max: usize) {
    if value.is_empty() {
        errors.push(field, REQUIRED);
        return;
    }
    let len = value.chars().count();
    if len < min || len > max {
        errors.push(
            field,
            format!("Field must be between {min} and {max} characters long."),
        );
    }
}

/// Whitespace-only counts as missing; accepted values are kept verbatim.
fn required(errors: &mut FieldErrors, field: &'static str, value: &str) -> String {
    if value.trim().is_empty() {
        errors.push(field, REQUIRED);
    }
    value.to_string()
}
