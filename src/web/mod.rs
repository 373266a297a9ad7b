pub mod account;
pub mod category;
pub mod comment;
pub mod error;
pub mod index;
pub mod post;
pub mod profile;

use actix_web::http::header;
use actix_web::HttpResponse;
use serde::Deserialize;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Route order matters: static segments such as /posts/create/ come first.
    index::configure(conf);
    post::configure(conf);
    comment::configure(conf);
    category::configure(conf);
    profile::configure(conf);
    account::configure(conf);
}

/// `?page=` on list views.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// 302 to a local URL.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}
