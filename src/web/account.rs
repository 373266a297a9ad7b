use super::redirect;
use crate::clock::ClockRef;
use crate::form::FormErrors;
use crate::middleware::ClientCtx;
use crate::session::{self, Level};
use crate::user::{
    get_user_by_username, hash_password, insert_user, is_safe_redirect, profile_url, username_taken,
    verify_password, LoginFormData, RegistrationFormData,
};
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_login)
        .service(post_login)
        .service(post_logout)
        .service(view_registration)
        .service(create_user);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    pub next: &'a str,
    pub error: &'a str,
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationTemplate<'a> {
    pub client: ClientCtx,
    pub username: &'a str,
    pub errors: &'a FormErrors,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

#[get("/auth/login/")]
async fn view_login(client: ClientCtx, query: web::Query<NextQuery>) -> HttpResponse {
    LoginTemplate {
        client,
        username: "",
        next: &query.next,
        error: "",
    }
    .to_response()
}

#[post("/auth/login/")]
async fn post_login(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    let username = form.username.trim();
    let user = get_user_by_username(&db, username)
        .await
        .map_err(error::ErrorInternalServerError)?;

    match user {
        Some(user) if verify_password(&form.password, &user.password) => {
            session::authenticate(&cookies, user.id)?;
            log::info!("user {} logged in", user.id);

            if is_safe_redirect(&form.next) {
                Ok(redirect(&form.next))
            } else {
                Ok(redirect("/"))
            }
        }
        _ => Ok(LoginTemplate {
            client,
            username,
            next: &form.next,
            error: "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        }
        .to_response()),
    }
}

#[post("/auth/logout/")]
async fn post_logout(cookies: Session) -> HttpResponse {
    session::forget(&cookies);
    redirect("/")
}

#[get("/auth/registration/")]
async fn view_registration(client: ClientCtx) -> HttpResponse {
    RegistrationTemplate {
        client,
        username: "",
        errors: &FormErrors::default(),
    }
    .to_response()
}

#[post("/auth/registration/")]
async fn create_user(
    client: ClientCtx,
    cookies: Session,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    form: web::Form<RegistrationFormData>,
) -> Result<HttpResponse, Error> {
    let username = match form.clean() {
        Ok(username) => username,
        Err(errors) => return Ok(render_registration(client, &form.username, &errors)),
    };

    if username_taken(&db, &username, None)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        let mut errors = FormErrors::default();
        errors.add("username", "A user with that username already exists.");
        return Ok(render_registration(client, &username, &errors));
    }

    let password_hash = hash_password(&form.password1)?;
    let user = insert_user(&db, &username, &password_hash, clock.now())
        .await
        .map_err(|e| {
            log::error!("create_user: {}", e);
            error::ErrorInternalServerError("Could not create account.")
        })?;

    session::authenticate(&cookies, user.id)?;
    client.add_message(Level::Success, "Welcome aboard!");
    Ok(redirect(&profile_url(&user.username)))
}

fn render_registration(client: ClientCtx, username: &str, errors: &FormErrors) -> HttpResponse {
    RegistrationTemplate {
        client,
        username,
        errors,
    }
    .to_response()
}
