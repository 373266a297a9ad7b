use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use rublog::db::{create_tables, init_db};
use rublog::global::Config;
use rublog::middleware::ClientCtx;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = init();

    let db = init_db(&config.database_url, config.db_max_connections)
        .await
        .expect("Database failed to connect.");
    create_tables(&db)
        .await
        .expect("Database tables failed to initialize.");

    let secret_key = match &config.secret_key {
        Some(key) => Key::from(key),
        None => {
            log::warn!("SECRET_KEY is not set; sessions will not survive a restart.");
            Key::generate()
        }
    };

    let clock = rublog::clock::system();
    log::info!("listening on {}", config.bind_address);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(clock.clone()))
            .wrap(rublog::web::error::error_handlers())
            .wrap(ClientCtx::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                secret_key.clone(),
            ))
            .wrap(Logger::new("%a %r %s %T"))
            .configure(rublog::web::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}

/// Loads `.env`, starts logging and reads the configuration.
/// Panics
fn init() -> &'static Config {
    // A missing .env file is fine; the real environment may carry everything.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    rublog::global::init()
}
