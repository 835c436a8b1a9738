//! User notifications.
//!
//! # Design
//! Planka has no endpoint for a single action, so [`Notification::action`]
//! scans the card's actions for the referenced id.

use serde::{Deserialize, Serialize};

use super::{foreign_key, Action, Card, User};
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::overload::Args;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_read: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub action_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Notification, "notification", required: [is_read, user_id, action_id, card_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["isRead"])?;
        let path = self.path()?;
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let path = self.path()?;
        self.pull(&path)
    }
});

impl Notification {
    fn path(&self) -> Result<String> {
        Ok(format!("/api/notifications/{}", self.require_id()?))
    }

    pub fn user(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "userId", &self.user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }

    pub fn card(&self) -> Result<Card> {
        let id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        self.routes()?.item(&format!("/api/cards/{id}"))
    }

    /// The action that raised this notification, found in its card's feed.
    pub fn action(&self) -> Result<Action> {
        let action_id = foreign_key(Self::NAME, "actionId", &self.action_id)?;
        self.card()?
            .actions()?
            .into_iter()
            .find(|a| a.id() == Some(action_id))
            .ok_or_else(|| ApiError::NotFound {
                endpoint: format!("action {action_id}"),
            })
    }

    pub fn mark_as_read(&mut self) -> Result<()> {
        self.update(Args::new().kw("isRead", true))
    }
}
