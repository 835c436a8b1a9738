//! Users and their account settings.
//!
//! # Design
//! Username, email and password each have their own endpoint and may need
//! the current password. Project, board and card lookups walk what the
//! session can see and keep the ones this user belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Board, Card, Notification, Project};
use crate::error::Result;
use crate::field::Field;
use crate::overload::Args;
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::{take_item, Routes};

const UPDATE_OPTIONS: &[&str] = &[
    "name",
    "username",
    "email",
    "language",
    "organization",
    "phone",
    "avatarUrl",
    "isAdmin",
    "isDeletionLocked",
    "isLocked",
    "isRoleLocked",
    "isUsernameLocked",
    "subscribeToOwnCards",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub username: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub email: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub language: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub organization: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub phone: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub avatar_url: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_sso: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_admin: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_deletion_locked: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_locked: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_role_locked: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_username_locked: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub subscribe_to_own_cards: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub deleted_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(User, "user", required: [name, email], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, UPDATE_OPTIONS)?;
        let path = self.path()?;
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let path = self.path()?;
        self.pull(&path)
    }
});

impl User {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    fn path(&self) -> Result<String> {
        Ok(format!("/api/users/{}", self.require_id()?))
    }

    /// Projects the user belongs to.
    pub fn projects(&self) -> Result<Vec<Project>> {
        let id = self.require_id()?;
        let mut member_of = Vec::new();
        for project in self.routes()?.items::<Project>("/api/projects")? {
            if project.users()?.iter().any(|u| u.id() == Some(id)) {
                member_of.push(project);
            }
        }
        Ok(member_of)
    }

    /// Boards the user holds a membership on.
    pub fn boards(&self) -> Result<Vec<Board>> {
        let id = self.require_id()?;
        let mut boards = Vec::new();
        for project in self.projects()? {
            for membership in project.board_memberships()? {
                if membership.user_id.as_deref() == Some(id) {
                    boards.push(membership.board()?);
                }
            }
        }
        Ok(boards)
    }

    /// Cards the user is assigned to.
    pub fn cards(&self) -> Result<Vec<Card>> {
        let id = self.require_id()?;
        let mut cards = Vec::new();
        for board in self.boards()? {
            for membership in board.card_memberships()? {
                if membership.user_id.as_deref() == Some(id) {
                    cards.push(membership.card()?);
                }
            }
        }
        Ok(cards)
    }

    pub fn manager_of(&self) -> Result<Vec<Project>> {
        let id = self.require_id()?;
        let mut managed = Vec::new();
        for project in self.projects()? {
            if project.managers()?.iter().any(|m| m.user_id.as_deref() == Some(id)) {
                managed.push(project);
            }
        }
        Ok(managed)
    }

    pub fn notifications(&self) -> Result<Vec<Notification>> {
        let id = self.require_id()?;
        Ok(self
            .routes()?
            .items::<Notification>("/api/notifications")?
            .into_iter()
            .filter(|n| n.user_id.as_deref() == Some(id))
            .collect())
    }

    /// Planka asks for the current password unless an admin changes
    /// someone else's account.
    pub fn update_username(&mut self, username: &str, current_password: Option<&str>) -> Result<()> {
        self.patch_credential("username", "username", username, current_password)
    }

    pub fn update_email(&mut self, email: &str, current_password: Option<&str>) -> Result<()> {
        self.patch_credential("email", "email", email, current_password)
    }

    pub fn update_password(&mut self, password: &str, current_password: Option<&str>) -> Result<()> {
        self.patch_credential("password", "password", password, current_password)
    }

    fn patch_credential(
        &mut self,
        endpoint: &str,
        key: &str,
        value: &str,
        current_password: Option<&str>,
    ) -> Result<()> {
        let mut body = FieldMap::new();
        body.insert(key.to_string(), Value::String(value.to_string()));
        if let Some(current) = current_password {
            body.insert("currentPassword".to_string(), Value::String(current.to_string()));
        }
        let path = format!("{}/{endpoint}", self.path()?);
        self.push(&path, &body)
    }

    /// Upload a new avatar image.
    pub fn set_avatar(&mut self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = format!("{}/avatar", self.path()?);
        let body = self.routes()?.upload(&path, file_name, bytes)?;
        self.reload(take_item(body, &path)?)
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        self.routes()?.delete(&self.path()?)?;
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::testing::{body_json, MockTransport};
    use serde_json::json;

    fn user(mock: &std::sync::Arc<MockTransport>) -> User {
        mock.routes()
            .decode(json!({"id": "7", "name": "Ann", "username": "ann", "email": "ann@x.io", "isAdmin": false}))
            .unwrap()
    }

    #[test]
    fn update_with_keywords_only_sends_those() {
        let mock = MockTransport::new();
        let mut u = user(&mock);
        mock.push_item(json!({"id": "7", "name": "Ann", "email": "ann@x.io", "organization": "ACME"}));
        u.update(args!(organization = "ACME")).unwrap();
        assert_eq!(body_json(&mock.last_request().unwrap()), json!({"organization": "ACME"}));
        assert_eq!(u.organization.as_deref(), Some("ACME"));
    }

    #[test]
    fn password_change_carries_current_password() {
        let mock = MockTransport::new();
        let mut u = user(&mock);
        mock.push_item(json!({"id": "7", "name": "Ann", "email": "ann@x.io"}));
        u.update_password("n3w-secret", Some("old-secret")).unwrap();
        let req = mock.last_request().unwrap();
        assert_eq!(mock.calls()[0], ("PATCH".to_string(), "/api/users/7/password".to_string()));
        assert_eq!(body_json(&req), json!({"password": "n3w-secret", "currentPassword": "old-secret"}));
    }

    #[test]
    fn username_change_without_current_password() {
        let mock = MockTransport::new();
        let mut u = user(&mock);
        mock.push_item(json!({"id": "7", "name": "Ann", "username": "annie", "email": "ann@x.io"}));
        u.update_username("annie", None).unwrap();
        assert_eq!(body_json(&mock.last_request().unwrap()), json!({"username": "annie"}));
        assert_eq!(u.username.as_deref(), Some("annie"));
    }

    #[test]
    fn projects_filter_by_membership() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"items": [{"id": "1", "name": "A"}, {"id": "2", "name": "B"}]}));
        mock.push_json(200, json!({"item": {"id": "1"}, "included": {"users": [{"id": "7", "name": "Ann", "email": "a"}]}}));
        mock.push_json(200, json!({"item": {"id": "2"}, "included": {"users": [{"id": "8", "name": "Bob", "email": "b"}]}}));
        let projects = user(&mock).projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id(), Some("1"));
    }

    #[test]
    fn notifications_are_scoped_to_user() {
        let mock = MockTransport::new();
        mock.push_json(
            200,
            json!({"items": [
                {"id": "1", "isRead": false, "userId": "7", "actionId": "9", "cardId": "100"},
                {"id": "2", "isRead": false, "userId": "8", "actionId": "9", "cardId": "100"}
            ]}),
        );
        let notes = user(&mock).notifications().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id(), Some("1"));
    }

    #[test]
    fn avatar_upload_reloads_user() {
        let mock = MockTransport::new();
        let mut u = user(&mock);
        mock.push_item(json!({"id": "7", "name": "Ann", "email": "ann@x.io", "avatarUrl": "http://planka.test/user-avatars/a.png"}));
        u.set_avatar("a.png", b"\x89PNG").unwrap();
        assert!(u.avatar_url.as_deref().unwrap().ends_with("a.png"));
        assert!(u.is_bound());
    }
}
