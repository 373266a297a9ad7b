use super::redirect;
use crate::clock::ClockRef;
use crate::comment::{
    delete_comment as remove_comment, get_comment_in_post, insert_comment,
    update_comment as save_comment, CommentFormData,
};
use crate::form::FormErrors;
use crate::middleware::ClientCtx;
use crate::orm::comments;
use crate::post::{get_post_for_template, PostForTemplate};
use crate::session::Level;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_comment)
        .service(edit_comment)
        .service(update_comment)
        .service(delete_comment)
        .service(destroy_comment);
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentUpdateTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comment: &'a comments::Model,
    pub form: &'a CommentFormData,
    pub errors: &'a FormErrors,
}

#[derive(Template)]
#[template(path = "comment_delete.html")]
pub struct CommentDeleteTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comment: &'a comments::Model,
}

/// Resolves `(post_id, comment_id)` for the comment's owner.
async fn get_owned_comment(
    client: &ClientCtx,
    db: &DatabaseConnection,
    post_id: i32,
    comment_id: i32,
) -> Result<(PostForTemplate, comments::Model), Error> {
    client.require_user()?;
    let comment = get_comment_in_post(db, post_id, comment_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;
    client.require_owner(&comment)?;

    let post = get_post_for_template(db, post_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    Ok((post, comment))
}

#[post("/posts/{post_id:[0-9]+}/comment/")]
pub async fn create_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    path: web::Path<i32>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_user()?;
    let now = clock.now();
    let post = get_post_for_template(&db, path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .filter(|post| post.is_visible_to(Some(user_id), now))
        .ok_or_else(|| error::ErrorNotFound("Post not found."))?;

    match form.clean() {
        Ok(text) => {
            let comment = insert_comment(&db, post.id, user_id, text, now)
                .await
                .map_err(error::ErrorInternalServerError)?;
            log::debug!("user {} commented {} on post {}", user_id, comment.id, post.id);
            client.add_message(Level::Success, "Comment added!");
        }
        Err(errors) => {
            client.add_message(Level::Error, errors.message("text"));
        }
    }

    Ok(redirect(&post.get_url()))
}

#[get("/posts/{post_id:[0-9]+}/edit_comment/{comment_id:[0-9]+}/")]
pub async fn edit_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let (post, comment) = get_owned_comment(&client, &db, post_id, comment_id).await?;

    Ok(CommentUpdateTemplate {
        client,
        post: &post,
        comment: &comment,
        form: &CommentFormData::from_model(&comment),
        errors: &FormErrors::default(),
    }
    .to_response())
}

#[post("/posts/{post_id:[0-9]+}/edit_comment/{comment_id:[0-9]+}/")]
pub async fn update_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Form<CommentFormData>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let (post, comment) = get_owned_comment(&client, &db, post_id, comment_id).await?;

    let text = match form.clean() {
        Ok(text) => text,
        Err(errors) => {
            return Ok(CommentUpdateTemplate {
                client,
                post: &post,
                comment: &comment,
                form: &form,
                errors: &errors,
            }
            .to_response())
        }
    };

    save_comment(&db, comment, text)
        .await
        .map_err(error::ErrorInternalServerError)?;

    client.add_message(Level::Success, "Comment updated!");
    Ok(redirect(&post.get_url()))
}

#[get("/posts/{post_id:[0-9]+}/delete_comment/{comment_id:[0-9]+}/")]
pub async fn delete_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let (post, comment) = get_owned_comment(&client, &db, post_id, comment_id).await?;

    Ok(CommentDeleteTemplate {
        client,
        post: &post,
        comment: &comment,
    }
    .to_response())
}

#[post("/posts/{post_id:[0-9]+}/delete_comment/{comment_id:[0-9]+}/")]
pub async fn destroy_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, Error> {
    let (post_id, comment_id) = path.into_inner();
    let (post, comment) = get_owned_comment(&client, &db, post_id, comment_id).await?;

    remove_comment(&db, comment)
        .await
        .map_err(error::ErrorInternalServerError)?;

    client.add_message(Level::Success, "Comment deleted!");
    Ok(redirect(&post.get_url()))
}
