//! Join records. Each links two resources and hands both back when deleted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, Board, Card, Label, Project, User};
use crate::constants::{validate, BOARD_ROLES};
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::overload::Args;
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::Routes;

fn user_of<R: Record>(record: &R, user_id: &Field<Id>) -> Result<User> {
    let id = foreign_key(R::NAME, "userId", user_id)?;
    record.routes()?.item(&format!("/api/users/{id}"))
}

fn card_of<R: Record>(record: &R, card_id: &Field<Id>) -> Result<Card> {
    let id = foreign_key(R::NAME, "cardId", card_id)?;
    record.routes()?.item(&format!("/api/cards/{id}"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardMembership {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub role: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub can_comment: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub board_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(BoardMembership, "boardMembership", required: [role, board_id, user_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["role", "canComment"])?;
        if let Some(Value::String(role)) = fields.get("role") {
            validate("role", role, BOARD_ROLES)?;
        }
        let path = format!("/api/board-memberships/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let memberships = self.board()?.board_memberships()?;
        self.rescan(memberships)
    }
});

impl BoardMembership {
    pub fn user(&self) -> Result<User> {
        user_of(self, &self.user_id)
    }

    pub fn board(&self) -> Result<Board> {
        let id = foreign_key(Self::NAME, "boardId", &self.board_id)?;
        self.routes()?.item(&format!("/api/boards/{id}"))
    }

    pub fn delete(&mut self) -> Result<(User, Board)> {
        self.refresh()?;
        let path = format!("/api/board-memberships/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok((self.user()?, self.board()?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardMembership {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
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

impl_record!(CardMembership, "cardMembership", required: [card_id, user_id]);

impl CardMembership {
    pub fn user(&self) -> Result<User> {
        user_of(self, &self.user_id)
    }

    pub fn card(&self) -> Result<Card> {
        card_of(self, &self.card_id)
    }

    /// Planka addresses card memberships by card and user, not by id.
    pub fn delete(&mut self) -> Result<(User, Card)> {
        let card_id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        let user_id = foreign_key(Self::NAME, "userId", &self.user_id)?;
        let mut body = FieldMap::new();
        body.insert("userId".to_string(), Value::String(user_id.to_string()));
        self.routes()?
            .delete_with(&format!("/api/cards/{card_id}/memberships"), &body)?;
        Ok((self.user()?, self.card()?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardLabel {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub label_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(CardLabel, "cardLabel", required: [card_id, label_id]);

impl CardLabel {
    pub fn card(&self) -> Result<Card> {
        card_of(self, &self.card_id)
    }

    pub fn board(&self) -> Result<Board> {
        self.card()?.board()
    }

    /// Labels have no single-item endpoint; scan the board's.
    pub fn label(&self) -> Result<Label> {
        let label_id = foreign_key(Self::NAME, "labelId", &self.label_id)?;
        self.board()?
            .labels()?
            .into_iter()
            .find(|l| l.id() == Some(label_id))
            .ok_or_else(|| ApiError::NotFound {
                endpoint: format!("label {label_id}"),
            })
    }

    pub fn delete(&mut self) -> Result<(Card, Label)> {
        let card_id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        let label_id = foreign_key(Self::NAME, "labelId", &self.label_id)?;
        self.routes()?
            .delete(&format!("/api/cards/{card_id}/labels/{label_id}"))?;
        Ok((self.card()?, self.label()?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectManager {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub project_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(ProjectManager, "projectManager", required: [project_id, user_id], {
    fn refresh(&mut self) -> Result<()> {
        let managers = self.project()?.managers()?;
        self.rescan(managers)
    }
});

impl ProjectManager {
    pub fn user(&self) -> Result<User> {
        user_of(self, &self.user_id)
    }

    pub fn project(&self) -> Result<Project> {
        let id = foreign_key(Self::NAME, "projectId", &self.project_id)?;
        self.routes()?.item(&format!("/api/projects/{id}"))
    }

    pub fn delete(&mut self) -> Result<(User, Project)> {
        self.refresh()?;
        let path = format!("/api/project-managers/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok((self.user()?, self.project()?))
    }
}
