//! Note routes. Every handler takes an [`AuthenticatedUser`] and passes its id
//! to the repository, which scopes the statement to that owner.
//!
//! [`AuthenticatedUser`]: crate::auth::AuthenticatedUser

pub mod mutate;
pub mod query;
