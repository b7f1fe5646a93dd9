use actix_web::{web, HttpResponse};

use crate::{
    auth::AuthenticatedUser, errors::ServerError, models::note::ListQuery, AppState,
};

pub async fn list(
    user: AuthenticatedUser,
    input: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let query = input.into_inner().validate()?;
    let owner_id = user.id();

    let page = state
        .with_store(move |store| store.list_notes(owner_id, &query))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get(
    user: AuthenticatedUser,
    note_id: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let (owner_id, note_id) = (user.id(), note_id.into_inner());

    let note = state
        .with_store(move |store| store.get_note(owner_id, note_id))
        .await?;
    Ok(HttpResponse::Ok().json(note))
}
