//! Boards: the lists, labels and cards of one project board.
//!
//! # Design
//! Every collection is read from the `included` section of
//! `GET /api/boards/{id}`, fetched fresh on each call. Editors and viewers
//! are the members whose board membership carries that role.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    foreign_key, insert_default, user_id_of, Attachment, BoardMembership, Card, CardLabel, CardMembership, Label, List,
    Project, Task, User,
};
use crate::constants::{random_choice, validate, BOARD_ROLES, LABEL_COLORS, LIST_COLORS};
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::overload::{resolve, Args};
use crate::position;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Board {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent", deserialize_with = "position::lenient")]
    pub position: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub project_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Board, "board", required: [name, position, project_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["name", "position"])?;
        let path = format!("/api/boards/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let path = format!("/api/boards/{}", self.require_id()?);
        self.pull(&path)
    }
});

impl Board {
    /// An unsaved board; `position` and `projectId` are filled in by
    /// `Project::create_board`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            position: Field::Required,
            project_id: Field::Required,
            ..Default::default()
        }
    }

    fn path(&self) -> Result<String> {
        Ok(format!("/api/boards/{}", self.require_id()?))
    }

    fn included<R: Record>(&self, key: &str) -> Result<Vec<R>> {
        self.routes()?.included(&self.path()?, key)
    }

    pub fn project(&self) -> Result<Project> {
        let id = foreign_key(Self::NAME, "projectId", &self.project_id)?;
        self.routes()?.item(&format!("/api/projects/{id}"))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.included("users")
    }

    /// Members holding the `editor` role.
    pub fn editors(&self) -> Result<Vec<User>> {
        self.users_with_role("editor")
    }

    /// Members holding the `viewer` role.
    pub fn viewers(&self) -> Result<Vec<User>> {
        self.users_with_role("viewer")
    }

    fn users_with_role(&self, role: &str) -> Result<Vec<User>> {
        let memberships = self.board_memberships()?;
        let users = self.users()?;
        Ok(users
            .into_iter()
            .filter(|u| {
                memberships
                    .iter()
                    .any(|m| m.user_id.as_deref() == u.id() && m.role.as_deref() == Some(role))
            })
            .collect())
    }

    pub fn board_memberships(&self) -> Result<Vec<BoardMembership>> {
        self.included("boardMemberships")
    }

    pub fn labels(&self) -> Result<Vec<Label>> {
        self.included("labels")
    }

    pub fn lists(&self) -> Result<Vec<List>> {
        self.included("lists")
    }

    pub fn cards(&self) -> Result<Vec<Card>> {
        self.included("cards")
    }

    pub fn card_memberships(&self) -> Result<Vec<CardMembership>> {
        self.included("cardMemberships")
    }

    pub fn card_labels(&self) -> Result<Vec<CardLabel>> {
        self.included("cardLabels")
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.included("tasks")
    }

    pub fn attachments(&self) -> Result<Vec<Attachment>> {
        self.included("attachments")
    }

    /// Options: `name`, `position` (default 0), `color`.
    pub fn create_list(&self, args: Args) -> Result<List> {
        let mut fields = resolve(args, List::NAME, &["name", "position", "color"], &["name"], None)?;
        if let Some(Value::String(color)) = fields.get("color") {
            validate("color", color, LIST_COLORS)?;
        }
        let id = self.require_id()?;
        insert_default(&mut fields, "position", 0);
        fields.insert("boardId".to_string(), Value::String(id.to_string()));
        self.routes()?.create(&format!("/api/boards/{id}/lists"), &fields)
    }

    /// Options: `name`, `position` (default 0), `color` (default random;
    /// `"random"` also picks one).
    pub fn create_label(&self, args: Args) -> Result<Label> {
        let mut fields = resolve(args, Label::NAME, &["name", "position", "color"], &["name"], None)?;
        let color = match fields.get("color") {
            None | Some(Value::Null) => random_choice(LABEL_COLORS).to_string(),
            Some(Value::String(c)) if c == "random" => random_choice(LABEL_COLORS).to_string(),
            Some(Value::String(c)) => {
                validate("color", c, LABEL_COLORS)?;
                c.clone()
            }
            Some(other) => {
                return Err(ApiError::InvalidValue {
                    field: "color",
                    value: other.to_string(),
                    valid: LABEL_COLORS,
                })
            }
        };
        let id = self.require_id()?;
        fields.insert("color".to_string(), Value::String(color));
        insert_default(&mut fields, "position", 0);
        fields.insert("boardId".to_string(), Value::String(id.to_string()));
        self.routes()?.create(&format!("/api/boards/{id}/labels"), &fields)
    }

    /// Give `user` access to the board. Options: `role`, `canComment`.
    ///
    /// Without a role, `canComment == true` means editor and anything else
    /// viewer. Without `canComment`, editors may comment and viewers may not.
    pub fn add_user(&self, user: &User, args: Args) -> Result<BoardMembership> {
        let mut fields = resolve(args, BoardMembership::NAME, &["role", "canComment"], &[], None)?;
        let can_comment = fields.get("canComment").and_then(Value::as_bool);
        let role = match fields.get("role") {
            Some(Value::String(role)) => role.clone(),
            Some(other) => other.to_string(),
            None if can_comment == Some(true) => "editor".to_string(),
            None => "viewer".to_string(),
        };
        validate("role", &role, BOARD_ROLES)?;
        insert_default(&mut fields, "canComment", role == "editor");

        let id = self.require_id()?;
        fields.insert("role".to_string(), Value::String(role));
        fields.insert("userId".to_string(), Value::String(user.require_id()?.to_string()));
        fields.insert("boardId".to_string(), Value::String(id.to_string()));
        self.routes()?.create(&format!("/api/boards/{id}/memberships"), &fields)
    }

    /// Revoke a user's membership. Accepts `userId` or a `User` record.
    pub fn remove_user(&self, args: Args) -> Result<Option<User>> {
        let fields = resolve(args, User::NAME, &["userId"], &[], None)?;
        let user_id = user_id_of(BoardMembership::NAME, &fields)?;
        let mut removed = None;
        for mut membership in self.board_memberships()? {
            if membership.user_id.as_deref() == Some(user_id.as_str()) {
                let (user, _) = membership.delete()?;
                removed = Some(user);
            }
        }
        Ok(removed)
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        self.routes()?.delete(&self.path()?)?;
        Ok(self.clone())
    }

    pub fn link(&self) -> Result<String> {
        Ok(format!("{}/boards/{}", self.routes()?.base_url(), self.require_id()?))
    }
}
