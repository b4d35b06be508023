use std::env;

use actix_web::web::ServiceConfig;
use sqlx::{Pool, Postgres};

use crate::api::endpoints::{
    add_quote, dashboard, edit_quote, get_user_vote, random_quote, random_source_quotes,
    top_quotes, vote_quote,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(random_quote)
        .service(get_user_vote)
        .service(vote_quote)
        .service(top_quotes)
        .service(add_quote)
        .service(edit_quote)
        .service(random_source_quotes)
        .service(dashboard);
}
