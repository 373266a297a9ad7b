use super::{redirect, PageQuery};
use crate::clock::ClockRef;
use crate::form::FormErrors;
use crate::middleware::ClientCtx;
use crate::orm::{posts, users};
use crate::post::{paginate_posts, publicly_visible, select_for_template, PostPage};
use crate::session::Level;
use crate::user::{
    get_user_by_username, profile_url, update_profile as save_profile, username_taken,
    ProfileFormData,
};
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDateTime;
use sea_orm::{ColumnTrait, DatabaseConnection, QueryFilter};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile)
        .service(edit_profile)
        .service(update_profile);
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub client: ClientCtx,
    pub profile: &'a users::Model,
    pub page: &'a PostPage,
    pub now: NaiveDateTime,
}

#[derive(Template)]
#[template(path = "profile_edit.html")]
pub struct ProfileUpdateTemplate<'a> {
    pub client: ClientCtx,
    pub profile: &'a users::Model,
    pub form: &'a ProfileFormData,
    pub errors: &'a FormErrors,
}

async fn find_profile(db: &DatabaseConnection, username: &str) -> Result<users::Model, Error> {
    get_user_by_username(db, username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))
}

/// A user's posts. Owners see all of theirs, drafts and scheduled posts included.
#[get("/profile/{username}/")]
async fn view_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let profile = find_profile(&db, &path.into_inner()).await?;
    let now = clock.now();

    let mut select = select_for_template().filter(posts::Column::AuthorId.eq(profile.id));
    if !client.is_user_id(&profile.id) {
        select = select.filter(publicly_visible(now));
    }

    let page = paginate_posts(
        &db,
        select,
        &profile_url(&profile.username),
        query.page.as_deref(),
    )
    .await
    .map_err(error::ErrorInternalServerError)?
    .ok_or_else(|| error::ErrorNotFound("Invalid page."))?;

    Ok(ProfileTemplate {
        client,
        profile: &profile,
        page: &page,
        now,
    }
    .to_response())
}

#[get("/profile/{username}/edit/")]
async fn edit_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    client.require_user()?;
    let profile = find_profile(&db, &path.into_inner()).await?;
    client.require_owner(&profile)?;

    Ok(ProfileUpdateTemplate {
        client,
        profile: &profile,
        form: &ProfileFormData::from_model(&profile),
        errors: &FormErrors::default(),
    }
    .to_response())
}

#[post("/profile/{username}/edit/")]
async fn update_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    form: web::Form<ProfileFormData>,
) -> Result<HttpResponse, Error> {
    client.require_user()?;
    let profile = find_profile(&db, &path.into_inner()).await?;
    client.require_owner(&profile)?;

    let clean = match form.clean() {
        Ok(clean) => {
            if username_taken(&db, &clean.username, Some(profile.id))
                .await
                .map_err(error::ErrorInternalServerError)?
            {
                let mut errors = FormErrors::default();
                errors.add("username", "A user with that username already exists.");
                Err(errors)
            } else {
                Ok(clean)
            }
        }
        Err(errors) => Err(errors),
    };

    let clean = match clean {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok(ProfileUpdateTemplate {
                client,
                profile: &profile,
                form: &form,
                errors: &errors,
            }
            .to_response())
        }
    };

    let profile = save_profile(&db, profile, clean)
        .await
        .map_err(error::ErrorInternalServerError)?;

    client.add_message(Level::Success, "Profile updated!");
    Ok(redirect(&profile_url(&profile.username)))
}
