//! Card actions. Comments are the `commentCard` kind and are the only
//! actions that can be edited.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, Card, User};
use crate::error::Result;
use crate::field::Field;
use crate::overload::{resolve, Args};
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::Routes;

/// Action type Planka records for card comments.
pub const COMMENT_CARD: &str = "commentCard";

/// An entry in a card's activity feed. Only comments can be edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Action {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(rename = "type", skip_serializing_if = "Field::is_absent")]
    pub kind: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub data: Field<Value>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Action, "action", required: [kind, data, card_id, user_id], {
    /// Option: `text`. With no arguments the current comment text is resent.
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = if args.is_empty() {
            let mut fields = FieldMap::new();
            if let Some(text) = self.text() {
                fields.insert("text".to_string(), Value::String(text.to_string()));
            }
            fields
        } else {
            resolve(args, Self::NAME, &["text"], &[], None)?
        };
        let path = format!("/api/comment-actions/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let comments = self.card()?.comments()?;
        self.rescan(comments)
    }
});

impl Action {
    /// Comment body, when this is a comment.
    pub fn text(&self) -> Option<&str> {
        self.data.value()?.get("text")?.as_str()
    }

    pub fn is_comment(&self) -> bool {
        self.kind.as_deref() == Some(COMMENT_CARD)
    }

    pub fn card(&self) -> Result<Card> {
        let id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        self.routes()?.item(&format!("/api/cards/{id}"))
    }

    pub fn user(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "userId", &self.user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }

    pub fn set_text(&mut self, text: &str) -> Result<()> {
        self.update(Args::new().kw("text", text))
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        let path = format!("/api/comment-actions/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok(self.clone())
    }
}
