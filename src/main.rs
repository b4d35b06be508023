use actix_web::{web::Data, App, HttpServer};
use log::{log, Level};
use sqlx::postgres::PgPoolOptions;

mod api;
mod app;
mod auth;
mod errors;
mod schema;
mod selection;
mod utils;
mod voting;

use app::{AppState, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!()
        .run(&db)
        .await
        .expect("Failed to run migrations");

    let state = AppState { db };
    log!(Level::Info, "Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .configure(app::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
