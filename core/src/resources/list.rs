//! Board lists, card creation and server-side sorting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, insert_default, Board, Card};
use crate::constants::{validate, ListSort, LIST_COLORS};
use crate::error::Result;
use crate::field::Field;
use crate::overload::{resolve, Args};
use crate::position;
use crate::record::{impl_record, FieldMap, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct List {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent", deserialize_with = "position::lenient")]
    pub position: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub board_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub color: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(List, "list", required: [name, position, board_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["name", "position", "color"])?;
        if let Some(Value::String(color)) = fields.get("color") {
            validate("color", color, LIST_COLORS)?;
        }
        let path = format!("/api/lists/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    /// Lists have no single-item endpoint; re-read the board.
    fn refresh(&mut self) -> Result<()> {
        let lists = self.board()?.lists()?;
        self.rescan(lists)
    }
});

impl List {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            position: Field::Required,
            board_id: Field::Required,
            ..Default::default()
        }
    }

    pub fn board(&self) -> Result<Board> {
        let id = foreign_key(Self::NAME, "boardId", &self.board_id)?;
        self.routes()?.item(&format!("/api/boards/{id}"))
    }

    pub fn cards(&self) -> Result<Vec<Card>> {
        let id = self.require_id()?;
        Ok(self
            .board()?
            .cards()?
            .into_iter()
            .filter(|c| c.list_id.as_deref() == Some(id))
            .collect())
    }

    /// Options: `name`, `position` (default 0), `description`, `dueDate`,
    /// `isDueDateCompleted`, `stopwatch`, `creatorUserId`,
    /// `coverAttachmentId`, `isSubscribed`. Accepts a `Card` record.
    pub fn create_card(&self, args: Args) -> Result<Card> {
        let mut fields = resolve(
            args,
            Card::NAME,
            &[
                "name",
                "position",
                "description",
                "dueDate",
                "isDueDateCompleted",
                "stopwatch",
                "creatorUserId",
                "coverAttachmentId",
                "isSubscribed",
            ],
            &["name"],
            None,
        )?;
        let id = self.require_id()?;
        let board_id = foreign_key(Self::NAME, "boardId", &self.board_id)?;
        fields.insert("boardId".to_string(), Value::String(board_id.to_string()));
        fields.insert("listId".to_string(), Value::String(id.to_string()));
        insert_default(&mut fields, "position", 0);
        self.routes()?.create(&format!("/api/lists/{id}/cards"), &fields)
    }

    pub fn sort(&self, order: ListSort) -> Result<()> {
        let path = format!("/api/lists/{}/sort", self.require_id()?);
        let mut body = FieldMap::new();
        body.insert("type".to_string(), Value::String(order.as_str().to_string()));
        self.routes()?.post(&path, &body)?;
        Ok(())
    }

    pub fn sort_by_name(&self) -> Result<()> {
        self.sort(ListSort::Name)
    }

    pub fn sort_by_due_date(&self) -> Result<()> {
        self.sort(ListSort::DueDate)
    }

    pub fn sort_by_newest(&self) -> Result<()> {
        self.sort(ListSort::NewestFirst)
    }

    pub fn sort_by_oldest(&self) -> Result<()> {
        self.sort(ListSort::OldestFirst)
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        let path = format!("/api/lists/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::testing::{body_json, MockTransport};
    use serde_json::json;

    fn list(mock: &std::sync::Arc<MockTransport>) -> List {
        mock.routes()
            .decode(json!({"id": "3", "name": "Todo", "position": 65535, "boardId": "2"}))
            .unwrap()
    }

    #[test]
    fn create_card_fills_board_and_list() {
        let mock = MockTransport::new();
        mock.push_item(json!({"id": "100", "name": "Write docs", "position": 0, "boardId": "2", "listId": "3"}));
        let card = list(&mock).create_card(args!("Write docs", description = "all of them")).unwrap();
        assert_eq!(card.list_id.as_deref(), Some("3"));
        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/lists/3/cards"));
        assert_eq!(
            body_json(&req),
            json!({"description": "all of them", "name": "Write docs", "boardId": "2", "listId": "3", "position": 0})
        );
    }

    #[test]
    fn sort_posts_wire_name() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"item": {"id": "3"}, "included": {"cards": []}}));
        list(&mock).sort_by_newest().unwrap();
        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/lists/3/sort"));
        assert_eq!(body_json(&req), json!({"type": "createdAt_desc"}));
    }

    #[test]
    fn refresh_rescans_board() {
        let mock = MockTransport::new();
        let mut l = list(&mock);
        mock.push_item(json!({"id": "2", "name": "B", "projectId": "1"}));
        mock.push_json(
            200,
            json!({"item": {"id": "2"}, "included": {"lists": [
                {"id": "4", "name": "Other", "boardId": "2"},
                {"id": "3", "name": "Renamed", "position": 131070, "boardId": "2"}
            ]}}),
        );
        l.refresh().unwrap();
        assert_eq!(l.name.as_deref(), Some("Renamed"));
        assert_eq!(l.position, Field::Value(131070));
        assert!(l.is_bound());
    }

    #[test]
    fn cards_filter_by_list() {
        let mock = MockTransport::new();
        mock.push_item(json!({"id": "2", "name": "B", "projectId": "1"}));
        mock.push_json(
            200,
            json!({"item": {"id": "2"}, "included": {"cards": [
                {"id": "100", "name": "a", "listId": "3", "boardId": "2"},
                {"id": "101", "name": "b", "listId": "4", "boardId": "2"}
            ]}}),
        );
        let cards = list(&mock).cards().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id(), Some("100"));
    }
}
