use super::redirect;
use crate::clock::ClockRef;
use crate::comment::{get_comments_for_post, CommentForTemplate, CommentFormData};
use crate::form::{FormErrors, SelectOption};
use crate::middleware::ClientCtx;
use crate::orm::posts;
use crate::post::{
    delete_post as delete_post_and_comments, get_post_for_template, insert_post,
    update_post as save_post, PostChoices, PostForTemplate, PostFormData,
};
use crate::session::Level;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDateTime;
use sea_orm::{DatabaseConnection, EntityTrait};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(new_post)
        .service(create_post)
        .service(view_post)
        .service(edit_post)
        .service(update_post)
        .service(delete_post)
        .service(destroy_post);
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comments: &'a Vec<CommentForTemplate>,
    pub form: CommentFormData,
    pub now: NaiveDateTime,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate<'a> {
    pub client: ClientCtx,
    pub heading: &'a str,
    pub action: String,
    pub form: &'a PostFormData,
    pub errors: &'a FormErrors,
    pub categories: Vec<SelectOption>,
    pub locations: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "post_delete.html")]
pub struct PostDeleteTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
}

fn render_form(
    client: ClientCtx,
    heading: &str,
    action: String,
    form: &PostFormData,
    errors: &FormErrors,
    choices: &PostChoices,
) -> HttpResponse {
    PostFormTemplate {
        client,
        heading,
        action,
        form,
        errors,
        categories: form.category_options(choices),
        locations: form.location_options(choices),
    }
    .to_response()
}

/// Loads a post for mutation after the client has been checked for ownership.
async fn get_owned_post(
    client: &ClientCtx,
    db: &DatabaseConnection,
    id: i32,
) -> Result<posts::Model, Error> {
    client.require_user()?;
    let post = posts::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    client.require_owner(&post)?;
    Ok(post)
}

#[get("/posts/create/")]
pub async fn new_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
) -> Result<HttpResponse, Error> {
    client.require_user()?;
    let choices = PostChoices::load(&db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(render_form(
        client,
        "New post",
        "/posts/create/".to_owned(),
        &PostFormData::new_at(clock.now()),
        &FormErrors::default(),
        &choices,
    ))
}

#[post("/posts/create/")]
pub async fn create_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    form: web::Form<PostFormData>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_user()?;
    let choices = PostChoices::load(&db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let clean = match form.clean(&choices) {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok(render_form(
                client,
                "New post",
                "/posts/create/".to_owned(),
                &form,
                &errors,
                &choices,
            ))
        }
    };

    let post = insert_post(&db, user_id, clean, clock.now())
        .await
        .map_err(error::ErrorInternalServerError)?;
    log::info!("user {} created post {}", user_id, post.id);

    client.add_message(Level::Success, "Post created!");
    Ok(redirect(&client.get_profile_url()))
}

#[get("/posts/{post_id:[0-9]+}/")]
pub async fn view_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let now = clock.now();
    let post = get_post_for_template(&db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .filter(|post| post.is_visible_to(client.get_id(), now))
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    let comments = get_comments_for_post(&db, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostTemplate {
        client,
        post: &post,
        comments: &comments,
        form: CommentFormData::default(),
        now,
    }
    .to_response())
}

#[get("/posts/{post_id:[0-9]+}/edit/")]
pub async fn edit_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let post = get_owned_post(&client, &db, path.into_inner()).await?;
    let choices = PostChoices::load(&db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(render_form(
        client,
        "Edit post",
        format!("/posts/{}/edit/", post.id),
        &PostFormData::from_model(&post),
        &FormErrors::default(),
        &choices,
    ))
}

#[post("/posts/{post_id:[0-9]+}/edit/")]
pub async fn update_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Form<PostFormData>,
) -> Result<HttpResponse, Error> {
    let post = get_owned_post(&client, &db, path.into_inner()).await?;
    let choices = PostChoices::load(&db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let clean = match form.clean(&choices) {
        Ok(clean) => clean,
        Err(errors) => {
            return Ok(render_form(
                client,
                "Edit post",
                format!("/posts/{}/edit/", post.id),
                &form,
                &errors,
                &choices,
            ))
        }
    };

    let post = save_post(&db, post, clean)
        .await
        .map_err(error::ErrorInternalServerError)?;

    client.add_message(Level::Success, "Post updated!");
    Ok(redirect(&format!("/posts/{}/", post.id)))
}

#[get("/posts/{post_id:[0-9]+}/delete/")]
pub async fn delete_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_user()?;
    let post = get_post_for_template(&db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;
    client.require_owner(&post)?;

    Ok(PostDeleteTemplate {
        client,
        post: &post,
    }
    .to_response())
}

#[post("/posts/{post_id:[0-9]+}/delete/")]
pub async fn destroy_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let post = get_owned_post(&client, &db, path.into_inner()).await?;

    delete_post_and_comments(&db, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    log::info!("user {} deleted post {}", post.author_id, post.id);

    client.add_message(Level::Success, "Post deleted!");
    Ok(redirect(&client.get_profile_url()))
}
