//! Persistence seam. Every note operation takes the requesting owner's id and
//! applies it inside the same statement (or critical section) that reads or
//! mutates the row, so ownership is never checked apart from the access itself.

use std::sync::Arc;

use crate::{
    auth::password,
    config::Settings,
    errors::ServerError,
    models::{
        note::{NewNote, Note, NoteChanges, NotePage, NoteQuery},
        user::User,
    },
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub const USERNAME_TAKEN: &str = "Username already registered";
pub const EMAIL_TAKEN: &str = "Email already registered";

pub trait CredentialStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, ServerError>;

    /// Fails with `Conflict` when the username or email is already taken.
    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ServerError>;

    fn set_active(&self, user_id: i32, active: bool) -> Result<User, ServerError>;

    /// Checks a username/password pair. An unknown username and a wrong password
    /// both give `None` after one full key derivation.
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, ServerError> {
        match self.find_by_username(username)? {
            Some(user) if password::verify(password, &user.hashed_password) => Ok(Some(user)),
            Some(_) => Ok(None),
            None => {
                password::verify_dummy(password);
                Ok(None)
            }
        }
    }
}

pub trait NoteRepository: Send + Sync {
    fn list_notes(&self, owner_id: i32, query: &NoteQuery) -> Result<NotePage, ServerError>;

    fn get_note(&self, owner_id: i32, note_id: i32) -> Result<Note, ServerError>;

    fn create_note(&self, owner_id: i32, note: NewNote) -> Result<Note, ServerError>;

    fn update_note(
        &self,
        owner_id: i32,
        note_id: i32,
        changes: NoteChanges,
    ) -> Result<Note, ServerError>;

    fn delete_note(&self, owner_id: i32, note_id: i32) -> Result<(), ServerError>;
}

pub trait HealthCheck: Send + Sync {
    fn ping(&self) -> Result<(), ServerError>;
}

pub trait Store: CredentialStore + NoteRepository + HealthCheck {}

impl<T: CredentialStore + NoteRepository + HealthCheck> Store for T {}

/// Opens the store named by `DATABASE_URL`. `memory://` selects the in-process
/// store; anything else is handed to Postgres and migrated.
pub fn open(settings: &Settings) -> Result<Arc<dyn Store>, ServerError> {
    if settings.database_url.starts_with("memory:") {
        log::warn!("using the in-memory store, data will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&settings.database_url, settings.pool_size)?;
    store.run_migrations()?;
    Ok(Arc::new(store))
}

pub(crate) fn note_not_found() -> ServerError {
    ServerError::NotFound("Note")
}
