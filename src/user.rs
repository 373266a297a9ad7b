use crate::form::{clean_text, FormErrors, REQUIRED};
use crate::orm::users;
use actix_web::{error, Error};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::Deserialize;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern"));

/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug, FromQueryResult)]
pub struct ClientUser {
    pub id: i32,
    pub username: String,
}

pub async fn get_client_user(db: &DatabaseConnection, id: i32) -> Result<Option<ClientUser>, DbErr> {
    users::Entity::find_by_id(id)
        .select_only()
        .column(users::Column::Id)
        .column(users::Column::Username)
        .into_model::<ClientUser>()
        .one(db)
        .await
}

pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await
}

/// True if another account (not `except`) already uses `username`.
pub async fn username_taken(
    db: &DatabaseConnection,
    username: &str,
    except: Option<i32>,
) -> Result<bool, DbErr> {
    let mut select = users::Entity::find().filter(users::Column::Username.eq(username));
    if let Some(id) = except {
        select = select.filter(users::Column::Id.ne(id));
    }
    Ok(select.one(db).await?.is_some())
}

pub async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    password_hash: &str,
    now: NaiveDateTime,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_owned()),
        password: Set(password_hash.to_owned()),
        email: Set(String::new()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("hash_password: {}", e);
            error::ErrorInternalServerError("Could not store password.")
        })
}

/// Compares a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("verify_password: unreadable hash: {}", e);
            false
        }
    }
}

/// Only same-site absolute paths may be used as a post-login destination.
/// Browsers drop tabs and newlines from URLs, so any whitespace or control
/// character is refused outright.
pub fn is_safe_redirect(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Profile path with the username percent-encoded, safe for a `Location` header.
pub fn profile_url(username: &str) -> String {
    let username: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}/", username)
}

fn clean_username(errors: &mut FormErrors, raw: &str) -> String {
    let username = clean_text(errors, "username", raw, true, Some(USERNAME_MAX_CHARS));
    if !username.is_empty() && !USERNAME_PATTERN.is_match(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginFormData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationFormData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegistrationFormData {
    /// Returns the cleaned username. Uniqueness is checked separately.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let username = clean_username(&mut errors, &self.username);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_CHARS
                ),
            );
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(username)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileFormData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileFormData {
    pub fn from_model(user: &users::Model) -> Self {
        Self {
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }

    pub fn clean(&self) -> Result<CleanProfile, FormErrors> {
        let mut errors = FormErrors::default();
        let username = clean_username(&mut errors, &self.username);
        let email = clean_text(&mut errors, "email", &self.email, false, Some(254));
        if !email.is_empty() && !is_plausible_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        let first_name = clean_text(&mut errors, "first_name", &self.first_name, false, Some(150));
        let last_name = clean_text(&mut errors, "last_name", &self.last_name, false, Some(150));

        errors.into_result(CleanProfile {
            username,
            email,
            first_name,
            last_name,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user: users::Model,
    profile: CleanProfile,
) -> Result<users::Model, DbErr> {
    let mut active: users::ActiveModel = user.into();
    active.username = Set(profile.username);
    active.email = Set(profile.email);
    active.first_name = Set(profile.first_name);
    active.last_name = Set(profile.last_name);
    active.update(db).await
}
