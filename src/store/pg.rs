use std::time::Duration;

use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::{
    note_not_found, CredentialStore, HealthCheck, NoteRepository, EMAIL_TAKEN, USERNAME_TAKEN,
};
use crate::{
    errors::ServerError,
    models::{
        note::{NewNote, Note, NoteChanges, NotePage, NoteQuery},
        user::{InsertUser, User},
    },
    schema::{notes, users},
};

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Postgres store. Each call checks a connection out of the pool and hands it
/// back when the guard drops, whichever way the call returns.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self, ServerError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)?;
        log::info!("postgres pool ready ({max_size} connections)");
        Ok(PgStore { pool })
    }

    pub fn run_migrations(&self) -> Result<(), ServerError> {
        let mut pooled = self.pool.get()?;
        let connection: &mut PgConnection = &mut pooled;
        let applied = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
            log::error!("migrations: {e}");
            ServerError::MigrationError
        })?;
        for version in applied {
            log::info!("applied migration {version}");
        }
        Ok(())
    }
}

/// Escapes LIKE metacharacters so the term matches as a literal substring.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn owned_notes(owner_id: i32, search: Option<&str>) -> notes::BoxedQuery<'static, Pg> {
    let mut query = notes::table
        .filter(notes::user_id.eq(owner_id))
        .into_boxed();

    if let Some(term) = search {
        let pattern = like_pattern(term);
        query = query.filter(
            notes::title
                .ilike(pattern.clone())
                .or(notes::content.ilike(pattern)),
        );
    }

    query
}

impl CredentialStore for PgStore {
    fn find_by_username(&self, name: &str) -> Result<Option<User>, ServerError> {
        use crate::schema::users::dsl::{username, users};

        let mut connection = self.pool.get()?;
        Ok(users
            .filter(username.eq(name))
            .first::<User>(&mut connection)
            .optional()?)
    }

    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ServerError> {
        let mut connection = self.pool.get()?;
        let now = Utc::now().naive_utc();
        let record = InsertUser {
            username,
            email,
            hashed_password: password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match diesel::insert_into(users::table)
            .values(&record)
            .get_result::<User>(&mut connection)
        {
            Ok(user) => Ok(user),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                match info.constraint_name() {
                    Some(name) if name.contains("email") => {
                        Err(ServerError::Conflict(EMAIL_TAKEN))
                    }
                    _ => Err(ServerError::Conflict(USERNAME_TAKEN)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_active(&self, user_id: i32, active: bool) -> Result<User, ServerError> {
        use crate::schema::users::dsl::{is_active, updated_at, users};

        let mut connection = self.pool.get()?;
        diesel::update(users.find(user_id))
            .set((is_active.eq(active), updated_at.eq(Utc::now().naive_utc())))
            .get_result::<User>(&mut connection)
            .optional()?
            .ok_or(ServerError::NotFound("User"))
    }
}

impl NoteRepository for PgStore {
    fn list_notes(&self, owner_id: i32, query: &NoteQuery) -> Result<NotePage, ServerError> {
        let mut connection = self.pool.get()?;
        let search = query.search.as_deref();

        // repeatable read so the count and the page come from one snapshot
        let (items, total) = connection
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run::<_, DieselError, _>(|conn| {
                let total = owned_notes(owner_id, search)
                    .count()
                    .get_result::<i64>(conn)?;
                let items = owned_notes(owner_id, search)
                    .order((notes::updated_at.desc(), notes::id.desc()))
                    .offset(query.offset())
                    .limit(query.limit)
                    .load::<Note>(conn)?;
                Ok((items, total))
            })?;

        Ok(NotePage::new(items, total, query))
    }

    fn get_note(&self, owner_id: i32, note_id: i32) -> Result<Note, ServerError> {
        let mut connection = self.pool.get()?;
        notes::table
            .filter(notes::id.eq(note_id))
            .filter(notes::user_id.eq(owner_id))
            .first::<Note>(&mut connection)
            .optional()?
            .ok_or_else(note_not_found)
    }

    fn create_note(&self, owner_id: i32, note: NewNote) -> Result<Note, ServerError> {
        let mut connection = self.pool.get()?;
        let record = note.into_insertable(owner_id, Utc::now().naive_utc());

        Ok(diesel::insert_into(notes::table)
            .values(&record)
            .get_result::<Note>(&mut connection)?)
    }

    fn update_note(
        &self,
        owner_id: i32,
        note_id: i32,
        changes: NoteChanges,
    ) -> Result<Note, ServerError> {
        let mut connection = self.pool.get()?;
        let changeset = changes.into_changeset(Utc::now().naive_utc());

        diesel::update(
            notes::table
                .filter(notes::id.eq(note_id))
                .filter(notes::user_id.eq(owner_id)),
        )
        .set(&changeset)
        .get_result::<Note>(&mut connection)
        .optional()?
        .ok_or_else(note_not_found)
    }

    fn delete_note(&self, owner_id: i32, note_id: i32) -> Result<(), ServerError> {
        let mut connection = self.pool.get()?;
        let deleted = diesel::delete(
            notes::table
                .filter(notes::id.eq(note_id))
                .filter(notes::user_id.eq(owner_id)),
        )
        .execute(&mut connection)?;

        if deleted == 0 {
            return Err(note_not_found());
        }
        Ok(())
    }
}

impl HealthCheck for PgStore {
    fn ping(&self) -> Result<(), ServerError> {
        let mut connection = self.pool.get()?;
        diesel::sql_query("SELECT 1").execute(&mut connection)?;
        Ok(())
    }
}
