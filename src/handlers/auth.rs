use actix_web::{web, HttpResponse};

use crate::{
    auth::password,
    errors::ServerError,
    models::user::{LoginRequest, RegisterUser, TokenResponse, UserInfo},
    AppState,
};

pub async fn register(
    input: web::Json<RegisterUser>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let input = input.into_inner();
    input.validate()?;

    let user = state
        .with_store(move |store| {
            let record = password::hash(&input.password)?;
            store.create_user(&input.username, &input.email, &record)
        })
        .await
        .map_err(|e| {
            if let ServerError::Conflict(reason) = &e {
                log::info!("registration refused: {reason}");
            }
            e
        })?;

    log::info!("registered user {} ({})", user.username, user.id);
    Ok(HttpResponse::Created().json(UserInfo::from(&user)))
}

pub async fn token(
    input: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let LoginRequest { username, password } = input.into_inner();

    let attempted = username.clone();
    let user = state
        .with_store(move |store| store.authenticate(&username, &password))
        .await?
        .ok_or_else(|| {
            log::info!("failed login for {attempted:?}");
            ServerError::InvalidCredentials
        })?;

    let access_token = state.tokens.issue(&user.username)?;
    log::info!("issued token for {}", user.username);
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(access_token)))
}
