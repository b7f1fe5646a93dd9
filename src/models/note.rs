use chrono::NaiveDateTime;
use diesel::{AsChangeset, Insertable, Queryable};
use serde::{Deserialize as _, Deserializer};
use serde_derive::{Deserialize, Serialize};

use super::check_length;
use crate::errors::{CommonError, Fields, ServerError};
use crate::schema::notes;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

const TITLE_MAX: usize = 200;
const CONTENT_MAX: usize = 10_000;

#[derive(Clone, Debug, Queryable, Serialize, PartialEq)]
pub struct Note {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = notes)]
pub struct InsertNote {
    pub title: String,
    pub content: Option<String>,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: Option<String>,
}

impl NewNote {
    pub fn validate(&self) -> Result<(), ServerError> {
        let mut errors = vec![];
        check_length(&self.title, 1, TITLE_MAX, Fields::Title, &mut errors);
        if let Some(c) = &self.content {
            check_length(c, 0, CONTENT_MAX, Fields::Content, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::UserError(errors))
        }
    }

    pub fn into_insertable(self, owner_id: i32, now: NaiveDateTime) -> InsertNote {
        InsertNote {
            title: self.title,
            content: self.content,
            user_id: owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update body. `content` distinguishes an absent key (`None`) from an
/// explicit `null` (`Some(None)`), which clears the stored content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NoteChanges {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl NoteChanges {
    pub fn validate(&self) -> Result<(), ServerError> {
        let mut errors = vec![];
        if let Some(t) = &self.title {
            check_length(t, 1, TITLE_MAX, Fields::Title, &mut errors);
        }
        if let Some(Some(c)) = &self.content {
            check_length(c, 0, CONTENT_MAX, Fields::Content, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::UserError(errors))
        }
    }

    pub fn into_changeset(self, now: NaiveDateTime) -> NoteChangeset {
        NoteChangeset {
            title: self.title,
            content: self.content,
            updated_at: now,
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = notes)]
pub struct NoteChangeset {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub updated_at: NaiveDateTime,
}

impl NoteChangeset {
    pub fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        note.updated_at = self.updated_at;
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn validate(self) -> Result<NoteQuery, ServerError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        let mut errors = vec![];
        if page < 1 {
            errors.push(Fields::Page(CommonError::OutOfRange));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            errors.push(Fields::Limit(CommonError::OutOfRange));
        }
        if !errors.is_empty() {
            return Err(ServerError::UserError(errors));
        }

        Ok(NoteQuery {
            page,
            limit,
            search: self.search.filter(|s| !s.is_empty()),
        })
    }
}

/// A validated listing request: `page >= 1`, `limit` within `1..=100`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl NoteQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct NotePage {
    pub items: Vec<Note>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl NotePage {
    pub fn new(items: Vec<Note>, total: i64, query: &NoteQuery) -> Self {
        NotePage {
            items,
            total,
            page: query.page,
            limit: query.limit,
            pages: (total + query.limit - 1) / query.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: i64, limit: i64) -> NoteQuery {
        ListQuery {
            page: Some(page),
            limit: Some(limit),
            search: None,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn pages_round_up() {
        let q = query(1, 5);
        assert_eq!(NotePage::new(vec![], 12, &q).pages, 3);
        assert_eq!(NotePage::new(vec![], 10, &q).pages, 2);
        assert_eq!(NotePage::new(vec![], 0, &q).pages, 0);
        assert_eq!(query(3, 5).offset(), 10);
    }

    #[test]
    fn list_defaults_and_bounds() {
        let q = ListQuery::default().validate().unwrap();
        assert_eq!((q.page, q.limit, q.search), (1, 10, None));

        assert!(ListQuery {
            page: Some(0),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(ListQuery {
            limit: Some(101),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(ListQuery {
            limit: Some(100),
            search: Some(String::new()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .search
        .is_none());
    }

    #[test]
    fn explicit_null_content_is_kept_apart_from_missing() {
        let missing: NoteChanges = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(missing.content, None);

        let cleared: NoteChanges = serde_json::from_str(r#"{"content":null}"#).unwrap();
        assert_eq!(cleared.content, Some(None));
        assert_eq!(cleared.title, None);

        let set: NoteChanges = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(set.content, Some(Some("x".to_owned())));
    }

    #[test]
    fn note_length_limits() {
        let too_long = NewNote {
            title: "t".repeat(201),
            content: Some("c".repeat(10_001)),
        };
        match too_long.validate() {
            Err(ServerError::UserError(fields)) => assert_eq!(
                fields,
                vec![
                    Fields::Title(CommonError::TooLong),
                    Fields::Content(CommonError::TooLong)
                ]
            ),
            _ => panic!("expected a validation error"),
        }

        let empty_title = NoteChanges {
            title: Some(String::new()),
            content: None,
        };
        assert!(empty_title.validate().is_err());
    }
}
