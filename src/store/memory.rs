use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{
    note_not_found, CredentialStore, HealthCheck, NoteRepository, EMAIL_TAKEN, USERNAME_TAKEN,
};
use crate::{
    errors::ServerError,
    models::{
        note::{NewNote, Note, NoteChanges, NotePage, NoteQuery},
        user::User,
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    notes: BTreeMap<i32, Note>,
    last_user_id: i32,
    last_note_id: i32,
}

/// In-process store with the same contract as [`super::PgStore`]. Each
/// operation runs under one lock, which stands in for statement atomicity.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, ServerError> {
        self.tables.lock().map_err(|_| {
            log::error!("memory store lock poisoned");
            ServerError::StoreError
        })
    }
}

fn matches_search(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note
            .content
            .as_deref()
            .map_or(false, |c| c.to_lowercase().contains(needle))
}

impl CredentialStore for MemoryStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, ServerError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ServerError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == username) {
            return Err(ServerError::Conflict(USERNAME_TAKEN));
        }
        if tables.users.values().any(|u| u.email == email) {
            return Err(ServerError::Conflict(EMAIL_TAKEN));
        }

        tables.last_user_id += 1;
        let now = Utc::now().naive_utc();
        let user = User {
            id: tables.last_user_id,
            username: username.to_owned(),
            email: email.to_owned(),
            hashed_password: password_hash.to_owned(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn set_active(&self, user_id: i32, active: bool) -> Result<User, ServerError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(ServerError::NotFound("User"))?;
        user.is_active = active;
        user.updated_at = Utc::now().naive_utc();
        Ok(user.clone())
    }
}

impl NoteRepository for MemoryStore {
    fn list_notes(&self, owner_id: i32, query: &NoteQuery) -> Result<NotePage, ServerError> {
        let tables = self.lock()?;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let mut owned: Vec<&Note> = tables
            .notes
            .values()
            .filter(|n| n.user_id == owner_id)
            .filter(|n| needle.as_deref().map_or(true, |s| matches_search(n, s)))
            .collect();
        owned.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = owned.len() as i64;
        let items = owned
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(0))
            .cloned()
            .collect();

        Ok(NotePage::new(items, total, query))
    }

    fn get_note(&self, owner_id: i32, note_id: i32) -> Result<Note, ServerError> {
        let tables = self.lock()?;
        tables
            .notes
            .get(&note_id)
            .filter(|n| n.user_id == owner_id)
            .cloned()
            .ok_or_else(note_not_found)
    }

    fn create_note(&self, owner_id: i32, note: NewNote) -> Result<Note, ServerError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner_id) {
            log::error!("note insert for unknown user {owner_id}");
            return Err(ServerError::StoreError);
        }

        tables.last_note_id += 1;
        let record = note.into_insertable(owner_id, Utc::now().naive_utc());
        let note = Note {
            id: tables.last_note_id,
            title: record.title,
            content: record.content,
            user_id: record.user_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    fn update_note(
        &self,
        owner_id: i32,
        note_id: i32,
        changes: NoteChanges,
    ) -> Result<Note, ServerError> {
        let mut tables = self.lock()?;
        let note = tables
            .notes
            .get_mut(&note_id)
            .filter(|n| n.user_id == owner_id)
            .ok_or_else(note_not_found)?;

        changes
            .into_changeset(Utc::now().naive_utc())
            .apply(note);
        Ok(note.clone())
    }

    fn delete_note(&self, owner_id: i32, note_id: i32) -> Result<(), ServerError> {
        let mut tables = self.lock()?;
        let owned = tables
            .notes
            .get(&note_id)
            .map_or(false, |n| n.user_id == owner_id);
        if !owned {
            return Err(note_not_found());
        }

        tables.notes.remove(&note_id);
        Ok(())
    }
}

impl HealthCheck for MemoryStore {
    fn ping(&self) -> Result<(), ServerError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::note::ListQuery;

    fn store_with_users() -> (MemoryStore, i32, i32) {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "alice@example.com", "x:y").unwrap();
        let bob = store.create_user("bob", "bob@example.com", "x:y").unwrap();
        (store, alice.id, bob.id)
    }

    fn new_note(title: &str, content: Option<&str>) -> NewNote {
        NewNote {
            title: title.to_owned(),
            content: content.map(str::to_owned),
        }
    }

    fn page(page: i64, limit: i64, search: Option<&str>) -> NoteQuery {
        ListQuery {
            page: Some(page),
            limit: Some(limit),
            search: search.map(str::to_owned),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let (store, _, _) = store_with_users();
        assert!(matches!(
            store.create_user("alice", "other@example.com", "x:y"),
            Err(ServerError::Conflict(USERNAME_TAKEN))
        ));
        assert!(matches!(
            store.create_user("carol", "bob@example.com", "x:y"),
            Err(ServerError::Conflict(EMAIL_TAKEN))
        ));
        assert!(store.find_by_username("carol").unwrap().is_none());
    }

    #[test]
    fn notes_are_invisible_to_other_owners() {
        let (store, alice, bob) = store_with_users();
        let note = store.create_note(alice, new_note("mine", Some("secret"))).unwrap();

        assert!(matches!(store.get_note(bob, note.id), Err(ServerError::NotFound(_))));
        assert!(matches!(
            store.update_note(bob, note.id, NoteChanges::default()),
            Err(ServerError::NotFound(_))
        ));
        assert!(matches!(store.delete_note(bob, note.id), Err(ServerError::NotFound(_))));
        assert_eq!(store.list_notes(bob, &page(1, 10, None)).unwrap().total, 0);

        assert_eq!(store.get_note(alice, note.id).unwrap(), note);
    }

    #[test]
    fn pagination_over_twelve_notes() {
        let (store, alice, _) = store_with_users();
        for i in 0..12 {
            store.create_note(alice, new_note(&format!("note {i}"), None)).unwrap();
        }

        let first = store.list_notes(alice, &page(1, 5, None)).unwrap();
        assert_eq!((first.items.len(), first.total, first.pages), (5, 12, 3));
        assert_eq!(first.items[0].title, "note 11");

        let last = store.list_notes(alice, &page(3, 5, None)).unwrap();
        assert_eq!(last.items.len(), 2);

        let beyond = store.list_notes(alice, &page(9, 5, None)).unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!((beyond.total, beyond.pages), (12, 3));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_content() {
        let (store, alice, _) = store_with_users();
        store.create_note(alice, new_note("Groceries", Some("milk"))).unwrap();
        let hit = store
            .create_note(alice, new_note("Ideas", Some("a NeEdLe in here")))
            .unwrap();
        store.create_note(alice, new_note("Empty", None)).unwrap();

        let found = store.list_notes(alice, &page(1, 10, Some("needle"))).unwrap();
        assert_eq!(found.items, vec![hit]);

        let by_title = store.list_notes(alice, &page(1, 10, Some("GROC"))).unwrap();
        assert_eq!(by_title.total, 1);
    }

    #[test]
    fn partial_update_and_clear() {
        let (store, alice, _) = store_with_users();
        let note = store.create_note(alice, new_note("title", Some("body"))).unwrap();

        let renamed = store
            .update_note(
                alice,
                note.id,
                NoteChanges {
                    title: Some("renamed".to_owned()),
                    content: None,
                },
            )
            .unwrap();
        assert_eq!(renamed.title, "renamed");
        assert_eq!(renamed.content.as_deref(), Some("body"));
        assert!(renamed.updated_at >= note.updated_at);
        assert_eq!(renamed.created_at, note.created_at);

        let cleared = store
            .update_note(
                alice,
                note.id,
                NoteChanges {
                    title: None,
                    content: Some(None),
                },
            )
            .unwrap();
        assert_eq!(cleared.title, "renamed");
        assert_eq!(cleared.content, None);
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let (store, alice, _) = store_with_users();
        let note = store.create_note(alice, new_note("gone", None)).unwrap();
        store.delete_note(alice, note.id).unwrap();
        assert!(matches!(store.get_note(alice, note.id), Err(ServerError::NotFound(_))));
        assert!(matches!(store.delete_note(alice, note.id), Err(ServerError::NotFound(_))));
    }

    #[test]
    fn authenticate_checks_the_password() {
        let store = MemoryStore::new();
        let record = crate::auth::password::hash("hunter22").unwrap();
        store.create_user("dave", "dave@example.com", &record).unwrap();

        assert!(store.authenticate("dave", "hunter22").unwrap().is_some());
        assert!(store.authenticate("dave", "hunter23").unwrap().is_none());
        assert!(store.authenticate("nobody", "hunter22").unwrap().is_none());
    }
}
