//! Planka resource types.
//!
//! # Design
//! Each resource is a serde struct of `Field`s plus its bound `Routes`.
//! Relationships are foreign keys: accessors fetch fresh on every call and
//! return newly bound records, never cached copies. Join records
//! (`CardLabel`, `CardMembership`, `BoardMembership`, `ProjectManager`)
//! sever the relation on `delete` and hand back both endpoints.

mod action;
mod attachment;
mod board;
mod card;
mod label;
mod list;
mod membership;
mod misc;
mod notification;
mod project;
mod stopwatch;
mod task;
mod user;

pub use action::{Action, COMMENT_CARD};
pub use attachment::Attachment;
pub use board::Board;
pub use card::Card;
pub use label::Label;
pub use list::List;
pub use membership::{BoardMembership, CardLabel, CardMembership, ProjectManager};
pub use misc::{Archive, CardSubscription, IdentityProviderUser};
pub use notification::Notification;
pub use project::{Background, Project};
pub(crate) use project::normalize_background;
pub use stopwatch::{Stopwatch, StopwatchValue};
pub use task::Task;
pub use user::User;

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::record::{FieldMap, Id};

/// A foreign key that must be present before following it.
pub(crate) fn foreign_key<'a>(resource: &str, name: &str, field: &'a Field<Id>) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| ApiError::validation(format!("{resource}.{name} is not set")))
}

/// `userId` from resolved arguments, or `id` when a user record was passed.
pub(crate) fn user_id_of(resource: &str, fields: &FieldMap) -> Result<String> {
    fields
        .get("userId")
        .or_else(|| fields.get("id"))
        .and_then(id_text)
        .ok_or_else(|| ApiError::missing(resource, vec!["userId".to_string()]))
}

/// Ids arrive as strings but callers may pass numbers.
pub(crate) fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn insert_default(fields: &mut FieldMap, key: &str, value: impl Into<Value>) {
    if !fields.contains_key(key) {
        fields.insert(key.to_string(), value.into());
    }
}
