pub mod category;
pub mod clock;
pub mod comment;
pub mod db;
pub mod form;
pub mod global;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod post;
pub mod session;
pub mod template;
pub mod user;
pub mod web;
