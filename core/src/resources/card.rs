//! Cards and everything hung off them.
//!
//! # Design
//! Labels, tasks and the other board-wide collections are read from the
//! parent board and filtered by card id. Join records (`CardLabel`,
//! `CardMembership`) are created and removed through the card. The stopwatch
//! is a plain value on the card, edited through the borrowed [`Stopwatch`]
//! view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    foreign_key, insert_default, Action, Attachment, Board, CardLabel, CardMembership, Label, List, Stopwatch,
    StopwatchValue, Task, User, COMMENT_CARD,
};
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::overload::{resolve, Args};
use crate::position;
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::{take_item, Routes};

const UPDATE_OPTIONS: &[&str] = &[
    "name",
    "position",
    "description",
    "dueDate",
    "isDueDateCompleted",
    "stopwatch",
    "boardId",
    "listId",
    "creatorUserId",
    "coverAttachmentId",
    "isSubscribed",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Card {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent", deserialize_with = "position::lenient")]
    pub position: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub due_date: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_due_date_completed: Field<bool>,
    /// Raw storage; go through `get_stopwatch`/`set_stopwatch`.
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub(crate) stopwatch: Field<StopwatchValue>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub board_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub list_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub creator_user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub cover_attachment_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_subscribed: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Card, "card", required: [name, position, board_id, list_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, UPDATE_OPTIONS)?;
        let path = format!("/api/cards/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let path = format!("/api/cards/{}", self.require_id()?);
        self.pull(&path)
    }
});

impl Card {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            position: Field::Required,
            board_id: Field::Required,
            list_id: Field::Required,
            ..Default::default()
        }
    }

    fn path(&self) -> Result<String> {
        Ok(format!("/api/cards/{}", self.require_id()?))
    }

    pub fn creator(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "creatorUserId", &self.creator_user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }

    pub fn board(&self) -> Result<Board> {
        let id = foreign_key(Self::NAME, "boardId", &self.board_id)?;
        self.routes()?.item(&format!("/api/boards/{id}"))
    }

    pub fn list(&self) -> Result<List> {
        let list_id = foreign_key(Self::NAME, "listId", &self.list_id)?;
        self.board()?
            .lists()?
            .into_iter()
            .find(|l| l.id() == Some(list_id))
            .ok_or_else(|| ApiError::NotFound {
                endpoint: format!("list {list_id}"),
            })
    }

    pub fn labels(&self) -> Result<Vec<Label>> {
        let id = self.require_id()?;
        let board = self.board()?;
        let label_ids: Vec<String> = board
            .card_labels()?
            .into_iter()
            .filter(|cl| cl.card_id.as_deref() == Some(id))
            .filter_map(|cl| cl.label_id.cloned())
            .collect();
        Ok(board
            .labels()?
            .into_iter()
            .filter(|l| l.id().is_some_and(|lid| label_ids.iter().any(|x| x == lid)))
            .collect())
    }

    pub fn members(&self) -> Result<Vec<User>> {
        let id = self.require_id()?;
        let board = self.board()?;
        let user_ids: Vec<String> = board
            .card_memberships()?
            .into_iter()
            .filter(|m| m.card_id.as_deref() == Some(id))
            .filter_map(|m| m.user_id.cloned())
            .collect();
        Ok(board
            .users()?
            .into_iter()
            .filter(|u| u.id().is_some_and(|uid| user_ids.iter().any(|x| x == uid)))
            .collect())
    }

    /// Every action recorded on the card.
    pub fn actions(&self) -> Result<Vec<Action>> {
        self.routes()?.items(&format!("{}/actions", self.path()?))
    }

    /// Comment actions only.
    pub fn comments(&self) -> Result<Vec<Action>> {
        Ok(self
            .actions()?
            .into_iter()
            .filter(|a| a.kind.as_deref() == Some(COMMENT_CARD))
            .collect())
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        let id = self.require_id()?;
        Ok(self
            .board()?
            .tasks()?
            .into_iter()
            .filter(|t| t.card_id.as_deref() == Some(id))
            .collect())
    }

    pub fn attachments(&self) -> Result<Vec<Attachment>> {
        let id = self.require_id()?;
        Ok(self
            .board()?
            .attachments()?
            .into_iter()
            .filter(|a| a.card_id.as_deref() == Some(id))
            .collect())
    }

    /// Move the card to another list, possibly on another board.
    pub fn move_to(&mut self, list: &List) -> Result<()> {
        self.list_id = Field::Value(list.require_id()?.to_string());
        if let Some(board_id) = list.board_id.value() {
            self.board_id = Field::Value(board_id.clone());
        }
        self.update(Args::new())
    }

    pub fn duplicate(&self) -> Result<Card> {
        let path = format!("{}/duplicate", self.path()?);
        self.routes()?.create(&path, &self.fields()?)
    }

    pub fn add_label(&self, label: &Label) -> Result<CardLabel> {
        let id = self.require_id()?;
        let body = pair("labelId", label.require_id()?, "cardId", id);
        self.routes()?.create(&format!("/api/cards/{id}/labels"), &body)
    }

    pub fn add_member(&self, user: &User) -> Result<CardMembership> {
        let id = self.require_id()?;
        let body = pair("userId", user.require_id()?, "cardId", id);
        self.routes()?.create(&format!("/api/cards/{id}/memberships"), &body)
    }

    pub fn add_comment(&self, text: &str) -> Result<Action> {
        let id = self.require_id()?;
        let body = pair("text", text, "cardId", id);
        self.routes()?.create(&format!("/api/cards/{id}/comment-actions"), &body)
    }

    /// Options: `name`, `position` (default 0), `isCompleted` (default false).
    /// Accepts a `Task` record.
    pub fn add_task(&self, args: Args) -> Result<Task> {
        let mut fields = resolve(args, Task::NAME, &["name", "position", "isCompleted"], &["name"], None)?;
        let id = self.require_id()?;
        insert_default(&mut fields, "position", 0);
        insert_default(&mut fields, "isCompleted", false);
        fields.insert("cardId".to_string(), Value::String(id.to_string()));
        self.routes()?.create(&format!("/api/cards/{id}/tasks"), &fields)
    }

    pub fn add_attachment(&self, file_name: &str, bytes: &[u8]) -> Result<Attachment> {
        let path = format!("{}/attachments", self.path()?);
        let routes = self.routes()?;
        let body = routes.upload(&path, file_name, bytes)?;
        routes.decode(take_item(body, &path)?)
    }

    /// Attach a stopped, zeroed stopwatch unless one exists.
    pub fn add_stopwatch(&mut self) -> Result<()> {
        self.refresh()?;
        if self.stopwatch.value().is_some() {
            return Ok(());
        }
        self.set_stopwatch(Some(StopwatchValue::default()))
    }

    pub fn remove_label(&self, label: &Label) -> Result<()> {
        let id = self.require_id()?;
        let label_id = label.require_id()?;
        for mut card_label in self.board()?.card_labels()? {
            if card_label.card_id.as_deref() == Some(id) && card_label.label_id.as_deref() == Some(label_id) {
                card_label.delete()?;
            }
        }
        Ok(())
    }

    pub fn remove_member(&self, user: &User) -> Result<()> {
        let id = self.require_id()?;
        let user_id = user.require_id()?;
        for mut membership in self.board()?.card_memberships()? {
            if membership.card_id.as_deref() == Some(id) && membership.user_id.as_deref() == Some(user_id) {
                membership.delete()?;
            }
        }
        Ok(())
    }

    pub fn remove_comment(&self, comment: &Action) -> Result<()> {
        let comment_id = comment.require_id()?;
        for mut action in self.comments()? {
            if action.id() == Some(comment_id) {
                action.delete()?;
            }
        }
        Ok(())
    }

    pub fn remove_stopwatch(&mut self) -> Result<()> {
        self.set_stopwatch(None)
    }

    /// Stopwatch as last loaded, without touching the server.
    pub fn stopwatch(&self) -> Option<&StopwatchValue> {
        self.stopwatch.value()
    }

    /// Live view of the card's stopwatch. Every mutation goes through this
    /// card's `update`.
    pub fn get_stopwatch(&mut self) -> Stopwatch<'_> {
        Stopwatch::new(self)
    }

    /// Replace the stopwatch and push; `None` removes it.
    pub fn set_stopwatch(&mut self, value: Option<StopwatchValue>) -> Result<()> {
        self.editor(|card| {
            card.stopwatch = Field::from(value);
            Ok(())
        })
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        self.routes()?.delete(&self.path()?)?;
        Ok(self.clone())
    }

    pub fn link(&self) -> Result<String> {
        Ok(format!("{}/cards/{}", self.routes()?.base_url(), self.require_id()?))
    }
}

fn pair(k1: &str, v1: &str, k2: &str, v2: &str) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert(k1.to_string(), Value::String(v1.to_string()));
    map.insert(k2.to_string(), Value::String(v2.to_string()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::testing::{body_json, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn card_json() -> Value {
        json!({"id": "100", "name": "Write docs", "position": 65535, "boardId": "2", "listId": "3"})
    }

    fn card(mock: &Arc<MockTransport>) -> Card {
        mock.routes().decode(card_json()).unwrap()
    }

    #[test]
    fn editor_pushes_changed_name_once() {
        let mock = MockTransport::new();
        let mut c = card(&mock);
        mock.push_item(card_json());
        let mut updated = card_json();
        updated["name"] = json!("Renamed");
        mock.push_item(updated);

        c.editor(|c| {
            c.name.set("Renamed");
            Ok(())
        })
        .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("GET".to_string(), "/api/cards/100".to_string()));
        assert_eq!(calls[1], ("PATCH".to_string(), "/api/cards/100".to_string()));
        assert_eq!(body_json(&mock.last_request().unwrap())["name"], json!("Renamed"));
        assert_eq!(c.name.as_deref(), Some("Renamed"));
    }

    #[test]
    fn clearing_a_field_sends_null() {
        let mock = MockTransport::new();
        let mut c = card(&mock);
        c.due_date = Field::Null;
        mock.push_item(card_json());
        c.update(Args::new()).unwrap();
        let sent = body_json(&mock.last_request().unwrap());
        assert_eq!(sent["dueDate"], Value::Null);
        assert!(sent.get("description").is_none());
    }

    #[test]
    fn move_to_sets_list_and_board() {
        let mock = MockTransport::new();
        let mut c = card(&mock);
        let target: List = mock
            .routes()
            .decode(json!({"id": "7", "name": "Done", "boardId": "5"}))
            .unwrap();
        mock.push_item(json!({"id": "100", "name": "Write docs", "boardId": "5", "listId": "7"}));
        c.move_to(&target).unwrap();
        let sent = body_json(&mock.last_request().unwrap());
        assert_eq!(sent["listId"], json!("7"));
        assert_eq!(sent["boardId"], json!("5"));
        assert_eq!(c.list_id.as_deref(), Some("7"));
    }

    #[test]
    fn add_task_applies_defaults() {
        let mock = MockTransport::new();
        mock.push_item(json!({"id": "300", "name": "Check", "position": 0, "isCompleted": false, "cardId": "100"}));
        card(&mock).add_task(args!("Check")).unwrap();
        assert_eq!(
            body_json(&mock.last_request().unwrap()),
            json!({"name": "Check", "position": 0, "isCompleted": false, "cardId": "100"})
        );
    }

    #[test]
    fn add_comment_posts_text() {
        let mock = MockTransport::new();
        mock.push_item(json!({"id": "400", "type": "commentCard", "data": {"text": "hi"}, "cardId": "100", "userId": "1"}));
        let action = card(&mock).add_comment("hi").unwrap();
        assert_eq!(action.text(), Some("hi"));
        assert!(mock.last_request().unwrap().url.ends_with("/api/cards/100/comment-actions"));
    }

    #[test]
    fn labels_resolve_through_card_labels() {
        let mock = MockTransport::new();
        let board_item = json!({"item": {"id": "2", "name": "B", "projectId": "1"}});
        let included = json!({
            "item": {"id": "2"},
            "included": {
                "cardLabels": [
                    {"id": "1", "cardId": "100", "labelId": "11"},
                    {"id": "2", "cardId": "101", "labelId": "12"}
                ],
                "labels": [
                    {"id": "11", "name": "bug", "color": "berry-red", "boardId": "2"},
                    {"id": "12", "name": "feat", "color": "wet-moss", "boardId": "2"}
                ]
            }
        });
        mock.push_json(200, board_item);
        mock.push_json(200, included.clone());
        mock.push_json(200, included);
        let labels = card(&mock).labels().unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name.as_deref(), Some("bug"));
    }

    #[test]
    fn remove_stopwatch_sends_null() {
        let mock = MockTransport::new();
        let mut c = card(&mock);
        let mut with_sw = card_json();
        with_sw["stopwatch"] = json!({"startedAt": null, "total": 30});
        mock.push_item(with_sw);
        mock.push_item(card_json());
        c.remove_stopwatch().unwrap();
        assert_eq!(body_json(&mock.last_request().unwrap())["stopwatch"], Value::Null);
    }

    #[test]
    fn add_stopwatch_is_idempotent() {
        let mock = MockTransport::new();
        let mut c = card(&mock);
        let mut with_sw = card_json();
        with_sw["stopwatch"] = json!({"startedAt": null, "total": 30});
        mock.push_item(with_sw);
        c.add_stopwatch().unwrap();
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn duplicate_posts_own_fields() {
        let mock = MockTransport::new();
        mock.push_item(json!({"id": "101", "name": "Write docs", "boardId": "2", "listId": "3"}));
        let copy = card(&mock).duplicate().unwrap();
        assert_eq!(copy.id(), Some("101"));
        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/cards/100/duplicate"));
        assert_eq!(body_json(&req)["name"], json!("Write docs"));
    }

    #[test]
    fn new_card_cannot_push_until_required_fields_are_set() {
        let c = Card::new("Draft");
        match c.fields().unwrap_err() {
            ApiError::MissingRequired { fields, .. } => {
                assert_eq!(fields, vec!["position", "boardId", "listId"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
