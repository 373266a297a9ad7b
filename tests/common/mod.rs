#![allow(dead_code)]

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::web::Data;
use actix_web::{test, App};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rublog::clock::{ClockRef, FixedClock};
use rublog::db::{create_tables, init_db};
use rublog::middleware::ClientCtx;
use rublog::orm::{categories, comments, locations, posts, users};
use rublog::user::{hash_password, insert_user};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;

pub const PASSWORD: &str = "correct-horse-battery";

/// The instant every test app believes it is.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

pub fn yesterday() -> NaiveDateTime {
    now() - Duration::days(1)
}

pub fn tomorrow() -> NaiveDateTime {
    now() + Duration::days(1)
}

/// A private in-memory database. One connection, or each would see its own empty database.
pub async fn setup_db() -> DatabaseConnection {
    let db = init_db("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    create_tables(&db).await.expect("tables");
    db
}

pub async fn init_app(
    db: &DatabaseConnection,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let clock: ClockRef = Arc::new(FixedClock(now()));
    test::init_service(
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(clock))
            .wrap(rublog::web::error::error_handlers())
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64]))
                    .cookie_secure(false)
                    .build(),
            )
            .configure(rublog::web::configure),
    )
    .await
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> users::Model {
    let hash = hash_password(PASSWORD).unwrap();
    insert_user(db, username, &hash, yesterday()).await.unwrap()
}

pub async fn create_category(
    db: &DatabaseConnection,
    slug: &str,
    is_published: bool,
) -> categories::Model {
    categories::ActiveModel {
        title: Set(format!("Category {}", slug)),
        description: Set(format!("All about {}.", slug)),
        slug: Set(slug.to_owned()),
        is_published: Set(is_published),
        created_at: Set(yesterday()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_location(db: &DatabaseConnection, name: &str) -> locations::Model {
    locations::ActiveModel {
        name: Set(name.to_owned()),
        is_published: Set(true),
        created_at: Set(yesterday()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &users::Model,
    category: Option<&categories::Model>,
    title: &str,
    pub_date: NaiveDateTime,
    is_published: bool,
) -> posts::Model {
    posts::ActiveModel {
        title: Set(title.to_owned()),
        text: Set(format!("Text of {}.", title)),
        pub_date: Set(pub_date),
        author_id: Set(author.id),
        category_id: Set(category.map(|c| c.id)),
        location_id: Set(None),
        is_published: Set(is_published),
        image: Set(None),
        created_at: Set(yesterday()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_comment(
    db: &DatabaseConnection,
    post: &posts::Model,
    author: &users::Model,
    text: &str,
) -> comments::Model {
    comments::ActiveModel {
        text: Set(text.to_owned()),
        post_id: Set(post.id),
        author_id: Set(author.id),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Signs in through the login form and returns the session cookies.
pub async fn login<S, B>(app: &S, username: &str) -> Vec<Cookie<'static>>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(&[("username", username), ("password", PASSWORD), ("next", "")])
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND, "login as {} failed", username);
    cookies_of(&res)
}

pub fn cookies_of<B>(res: &ServiceResponse<B>) -> Vec<Cookie<'static>> {
    res.response()
        .cookies()
        .map(|cookie| cookie.into_owned())
        .collect()
}

pub fn location_of<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub async fn get<S, B>(app: &S, uri: &str, cookies: &[Cookie<'static>]) -> ServiceResponse<B>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::get().uri(uri);
    for cookie in cookies {
        req = req.cookie(cookie.clone());
    }
    test::call_service(app, req.to_request()).await
}

pub async fn post_form<S, B>(
    app: &S,
    uri: &str,
    cookies: &[Cookie<'static>],
    form: &[(&str, &str)],
) -> ServiceResponse<B>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::post().uri(uri).set_form(form);
    for cookie in cookies {
        req = req.cookie(cookie.clone());
    }
    test::call_service(app, req.to_request()).await
}

pub async fn body_of<B: MessageBody>(res: ServiceResponse<B>) -> String {
    let body = test::read_body(res).await;
    String::from_utf8(body.to_vec()).unwrap()
}
