use actix_web::{web, HttpResponse};

use crate::{
    auth::AuthenticatedUser,
    errors::ServerError,
    models::note::{NewNote, NoteChanges},
    AppState,
};

pub async fn create(
    user: AuthenticatedUser,
    input: web::Json<NewNote>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let input = input.into_inner();
    input.validate()?;
    let owner_id = user.id();

    let note = state
        .with_store(move |store| store.create_note(owner_id, input))
        .await?;
    log::debug!("user {} created note {}", owner_id, note.id);
    Ok(HttpResponse::Created().json(note))
}

pub async fn update(
    user: AuthenticatedUser,
    note_id: web::Path<i32>,
    input: web::Json<NoteChanges>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let changes = input.into_inner();
    changes.validate()?;
    let (owner_id, note_id) = (user.id(), note_id.into_inner());

    let note = state
        .with_store(move |store| store.update_note(owner_id, note_id, changes))
        .await?;
    Ok(HttpResponse::Ok().json(note))
}

pub async fn delete(
    user: AuthenticatedUser,
    note_id: web::Path<i32>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let (owner_id, note_id) = (user.id(), note_id.into_inner());

    state
        .with_store(move |store| store.delete_note(owner_id, note_id))
        .await?;
    log::debug!("user {} deleted note {}", owner_id, note_id);
    Ok(HttpResponse::NoContent().finish())
}
