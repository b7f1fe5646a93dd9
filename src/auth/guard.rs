use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};

use crate::{errors::ServerError, models::user::User, AppState};

/// The active user behind a request's bearer token. Taking this as a handler
/// argument makes the route require authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_owned())
    } else {
        None
    }
}

/// Resolves a bearer token to its user. Bad tokens and vanished users are the
/// same `Unauthorized`; a deactivated account is `Forbidden`.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ServerError> {
    let username = state.tokens.verify(token)?;
    let user = state
        .with_store(move |store| store.find_by_username(&username))
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if !user.is_active {
        return Err(ServerError::Forbidden);
    }
    Ok(user)
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                log::error!("AppState is not registered on the app");
                ServerError::EnvironmentError
            })?;
            let token = token.ok_or(ServerError::Unauthorized)?;
            authenticate(&state, &token).await.map(AuthenticatedUser)
        })
    }
}
