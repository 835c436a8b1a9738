//! Projects, their managers and background.
//!
//! # Design
//! A new project without a background gets a random gradient. Adding a
//! manager who already manages the project sends nothing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{insert_default, user_id_of, Board, BoardMembership, ProjectManager, User};
use crate::constants::{validate, GRADIENTS};
use crate::error::Result;
use crate::field::Field;
use crate::overload::{resolve, Args};
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::{take_item, Routes};

/// Project background as Planka stores it: `{"type": "gradient", "name": "..."}`
/// or `{"type": "image"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Background {
    pub fn gradient(name: &str) -> Self {
        Self {
            kind: "gradient".to_string(),
            name: Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub background: Field<Background>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub background_image: Field<Value>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Project, "project", required: [name], {
    fn update(&mut self, args: Args) -> Result<()> {
        let mut fields = self.resolve_update(args, &["name", "background", "backgroundImage"])?;
        normalize_background(&mut fields)?;
        let path = format!("/api/projects/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let path = format!("/api/projects/{}", self.require_id()?);
        self.pull(&path)
    }
});

/// A bare gradient name becomes a full background object.
pub(crate) fn normalize_background(fields: &mut FieldMap) -> Result<()> {
    let name = match fields.get("background") {
        Some(Value::String(name)) => name.clone(),
        _ => return Ok(()),
    };
    validate("gradient", &name, GRADIENTS)?;
    fields.insert("background".to_string(), json!({ "name": name, "type": "gradient" }));
    Ok(())
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn path(&self) -> Result<String> {
        Ok(format!("/api/projects/{}", self.require_id()?))
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.routes()?.included(&self.path()?, "users")
    }

    pub fn managers(&self) -> Result<Vec<ProjectManager>> {
        self.routes()?.included(&self.path()?, "projectManagers")
    }

    pub fn board_memberships(&self) -> Result<Vec<BoardMembership>> {
        self.routes()?.included(&self.path()?, "boardMemberships")
    }

    pub fn boards(&self) -> Result<Vec<Board>> {
        self.routes()?.included(&self.path()?, "boards")
    }

    /// Options: `name`, `position` (default 0). Accepts a `Board` record.
    pub fn create_board(&self, args: Args) -> Result<Board> {
        let mut fields = resolve(args, Board::NAME, &["name", "position"], &["name"], None)?;
        let id = self.require_id()?;
        insert_default(&mut fields, "position", 0);
        fields.insert("projectId".to_string(), Value::String(id.to_string()));
        self.routes()?.create(&format!("/api/projects/{id}/boards"), &fields)
    }

    /// Make a user a project manager. Accepts `userId` or a `User` record.
    ///
    /// Returns `None` without a request when the user already manages the
    /// project.
    pub fn add_project_manager(&self, args: Args) -> Result<Option<ProjectManager>> {
        let fields = resolve(args, User::NAME, &["userId"], &[], None)?;
        let user_id = user_id_of(ProjectManager::NAME, &fields)?;
        if self.managers()?.iter().any(|m| m.user_id.as_deref() == Some(user_id.as_str())) {
            debug!(project = ?self.id(), %user_id, "already a project manager");
            return Ok(None);
        }
        let id = self.require_id()?;
        let mut body = FieldMap::new();
        body.insert("userId".to_string(), Value::String(user_id));
        body.insert("projectId".to_string(), Value::String(id.to_string()));
        self.routes()?
            .create(&format!("/api/projects/{id}/managers"), &body)
            .map(Some)
    }

    /// Remove a user from the project managers. Returns the user when a
    /// manager entry was found.
    pub fn remove_project_manager(&self, args: Args) -> Result<Option<User>> {
        let fields = resolve(args, User::NAME, &["userId"], &[], None)?;
        let user_id = user_id_of(ProjectManager::NAME, &fields)?;
        let mut removed = None;
        for mut manager in self.managers()? {
            if manager.user_id.as_deref() == Some(user_id.as_str()) {
                let (user, _) = manager.delete()?;
                removed = Some(user);
            }
        }
        Ok(removed)
    }

    pub fn set_background_gradient(&mut self, gradient: &str) -> Result<()> {
        self.update(Args::new().kw("background", gradient))
    }

    /// Upload an image and make it the project background.
    pub fn set_background_image(&mut self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = format!("{}/background-image", self.path()?);
        let body = self.routes()?.upload(&path, file_name, bytes)?;
        self.reload(take_item(body, &path)?)
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        self.routes()?.delete(&self.path()?)?;
        Ok(self.clone())
    }

    pub fn link(&self) -> Result<String> {
        Ok(format!("{}/projects/{}", self.routes()?.base_url(), self.require_id()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::ApiError;
    use crate::testing::{body_json, MockTransport};

    fn project(mock: &std::sync::Arc<MockTransport>) -> Project {
        mock.routes()
            .decode(json!({"id": "1", "name": "Demo", "background": {"type": "gradient", "name": "old-lime"}}))
            .unwrap()
    }

    #[test]
    fn create_board_defaults_position_and_project() {
        let mock = MockTransport::new();
        let p = project(&mock);
        mock.push_item(json!({"id": "10", "name": "Sprint 1", "position": 0, "projectId": "1"}));
        let board = p.create_board(args!("Sprint 1")).unwrap();
        assert_eq!(board.position, Field::Value(0));

        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/projects/1/boards"));
        assert_eq!(body_json(&req), json!({"name": "Sprint 1", "position": 0, "projectId": "1"}));
    }

    #[test]
    fn create_board_requires_name() {
        let mock = MockTransport::new();
        let err = project(&mock).create_board(args!(position = 2)).unwrap_err();
        assert!(matches!(err, ApiError::MissingRequired { .. }));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn duplicate_manager_is_suppressed() {
        let mock = MockTransport::new();
        let p = project(&mock);
        mock.push_json(
            200,
            json!({"item": {"id": "1"}, "included": {"projectManagers": [{"id": "50", "projectId": "1", "userId": "7"}]}}),
        );
        let added = p.add_project_manager(args!(userId = "7")).unwrap();
        assert!(added.is_none());
        assert_eq!(mock.calls(), vec![("GET".to_string(), "/api/projects/1".to_string())]);
    }

    #[test]
    fn manager_added_from_user_record() {
        let mock = MockTransport::new();
        let p = project(&mock);
        let user: User = mock.routes().decode(json!({"id": "8", "name": "Ann", "email": "a@x.io"})).unwrap();
        mock.push_json(200, json!({"item": {"id": "1"}, "included": {"projectManagers": []}}));
        mock.push_item(json!({"id": "51", "projectId": "1", "userId": "8"}));
        let manager = p.add_project_manager(Args::record(&user)).unwrap().unwrap();
        assert_eq!(manager.user_id.as_deref(), Some("8"));
        assert_eq!(body_json(&mock.last_request().unwrap()), json!({"userId": "8", "projectId": "1"}));
    }

    #[test]
    fn gradient_update_is_wrapped_and_validated() {
        let mock = MockTransport::new();
        let mut p = project(&mock);
        assert!(matches!(
            p.set_background_gradient("not-a-gradient"),
            Err(ApiError::InvalidValue { field: "gradient", .. })
        ));
        assert_eq!(mock.request_count(), 0);

        mock.push_item(json!({"id": "1", "name": "Demo", "background": {"type": "gradient", "name": "ocean-dive"}}));
        p.set_background_gradient("ocean-dive").unwrap();
        assert_eq!(
            body_json(&mock.last_request().unwrap()),
            json!({"background": {"name": "ocean-dive", "type": "gradient"}})
        );
        assert_eq!(p.background.value().unwrap().name.as_deref(), Some("ocean-dive"));
    }

    #[test]
    fn update_without_args_pushes_own_fields() {
        let mock = MockTransport::new();
        let mut p = project(&mock);
        p.name.set("Renamed");
        mock.push_item(json!({"id": "1", "name": "Renamed", "updatedAt": "2024-01-01T00:00:00Z"}));
        p.update(Args::new()).unwrap();
        let sent = body_json(&mock.last_request().unwrap());
        assert_eq!(sent["name"], json!("Renamed"));
        assert_eq!(sent["background"], json!({"type": "gradient", "name": "old-lime"}));
        assert_eq!(p.updated_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert!(p.background.is_unset());
    }

    #[test]
    fn delete_refreshes_then_deletes() {
        let mock = MockTransport::new();
        let mut p = project(&mock);
        mock.push_item(json!({"id": "1", "name": "Final"}));
        mock.push_item(json!({"id": "1"}));
        let snapshot = p.delete().unwrap();
        assert_eq!(snapshot.name.as_deref(), Some("Final"));
        assert_eq!(
            mock.calls(),
            vec![
                ("GET".to_string(), "/api/projects/1".to_string()),
                ("DELETE".to_string(), "/api/projects/1".to_string()),
            ]
        );
    }

    #[test]
    fn link_points_at_web_ui() {
        let mock = MockTransport::new();
        assert_eq!(project(&mock).link().unwrap(), "http://planka.test/projects/1");
    }
}
