#[macro_use]
extern crate diesel;

use std::sync::Arc;

use actix_web::web;

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;

use auth::TokenService;
use errors::ServerError;
use store::Store;

/// Shared, read-only request context: the store handle and the token signer.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        AppState { store, tokens }
    }

    /// Runs a store call on the blocking thread pool so database round-trips
    /// and key derivations never stall the async workers.
    pub async fn with_store<F, R>(&self, f: F) -> Result<R, ServerError>
    where
        F: FnOnce(&dyn Store) -> Result<R, ServerError> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        web::block(move || f(store.as_ref())).await?
    }
}
