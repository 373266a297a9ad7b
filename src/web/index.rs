use super::PageQuery;
use crate::clock::ClockRef;
use crate::middleware::ClientCtx;
use crate::post::{paginate_posts, publicly_visible, select_for_template, PostPage};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDateTime;
use sea_orm::{DatabaseConnection, QueryFilter};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub client: ClientCtx,
    pub page: &'a PostPage,
    pub now: NaiveDateTime,
}

/// Every publicly visible post, newest first.
#[get("/")]
async fn view_index(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let now = clock.now();
    let page = paginate_posts(
        &db,
        select_for_template().filter(publicly_visible(now)),
        "/",
        query.page.as_deref(),
    )
    .await
    .map_err(error::ErrorInternalServerError)?
    .ok_or_else(|| error::ErrorNotFound("Invalid page."))?;

    Ok(IndexTemplate {
        client,
        page: &page,
        now,
    }
    .to_response())
}
