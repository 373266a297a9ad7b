use super::PageQuery;
use crate::category::get_published_category;
use crate::clock::ClockRef;
use crate::middleware::ClientCtx;
use crate::orm::{categories, posts};
use crate::post::{paginate_posts, publicly_visible, select_for_template, PostPage};
use actix_web::{error, get, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::NaiveDateTime;
use sea_orm::{ColumnTrait, DatabaseConnection, QueryFilter};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_category);
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate<'a> {
    pub client: ClientCtx,
    pub category: &'a categories::Model,
    pub page: &'a PostPage,
    pub now: NaiveDateTime,
}

#[get("/category/{slug}/")]
async fn view_category(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    clock: web::Data<ClockRef>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let category = get_published_category(&db, &path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Category not found."))?;

    let now = clock.now();
    let page = paginate_posts(
        &db,
        select_for_template()
            .filter(posts::Column::CategoryId.eq(category.id))
            .filter(publicly_visible(now)),
        &format!("/category/{}/", category.slug),
        query.page.as_deref(),
    )
    .await
    .map_err(error::ErrorInternalServerError)?
    .ok_or_else(|| error::ErrorNotFound("Invalid page."))?;

    Ok(CategoryTemplate {
        client,
        category: &category,
        page: &page,
        now,
    }
    .to_response())
}
