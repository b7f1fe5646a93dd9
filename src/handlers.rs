use actix_web::{error, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::{
    errors::{Fields, ServerError},
    store::note_not_found,
    AppState,
};

pub mod auth;
pub mod note;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registers every route plus the extractor configs that turn malformed input
/// into the service's own error responses.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/token", web::post().to(auth::token)),
        )
        .service(
            web::scope("/notes")
                .route("", web::get().to(note::query::list))
                .route("/", web::get().to(note::query::list))
                .route("", web::post().to(note::mutate::create))
                .route("/", web::post().to(note::mutate::create))
                .route("/{id}", web::get().to(note::query::get))
                .route("/{id}", web::put().to(note::mutate::update))
                .route("/{id}", web::delete().to(note::mutate::delete)),
        );
}

fn json_error(err: error::JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    ServerError::UserError(vec![Fields::Body(err.to_string())]).into()
}

fn query_error(err: error::QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    ServerError::UserError(vec![Fields::Body(err.to_string())]).into()
}

// a note id that is not a number names no note at all
fn path_error(_: error::PathError, _: &HttpRequest) -> actix_web::Error {
    note_not_found().into()
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Notes API",
        "version": VERSION,
        "health": "/health",
    }))
}

pub async fn health(state: web::Data<AppState>) -> Result<HttpResponse, ServerError> {
    match state.with_store(|store| store.ping()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "status": "ok",
            "message": "API is healthy",
            "version": VERSION,
        }))),
        Err(e) => {
            log::error!("health check failed: {e}");
            Err(ServerError::Unavailable)
        }
    }
}
