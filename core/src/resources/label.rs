//! Board labels. Colours are checked against the palette before any request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, Board, Card};
use crate::constants::{validate, LABEL_COLORS};
use crate::error::Result;
use crate::field::Field;
use crate::overload::Args;
use crate::position;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Label {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent", deserialize_with = "position::lenient")]
    pub position: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub color: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub board_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Label, "label", required: [name, position, color, board_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["name", "color", "position"])?;
        if let Some(Value::String(color)) = fields.get("color") {
            validate("color", color, LABEL_COLORS)?;
        }
        let path = format!("/api/labels/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let labels = self.board()?.labels()?;
        self.rescan(labels)
    }
});

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            position: Field::Required,
            color: Field::Required,
            board_id: Field::Required,
            ..Default::default()
        }
    }

    pub fn board(&self) -> Result<Board> {
        let id = foreign_key(Self::NAME, "boardId", &self.board_id)?;
        self.routes()?.item(&format!("/api/boards/{id}"))
    }

    /// Cards carrying this label.
    pub fn cards(&self) -> Result<Vec<Card>> {
        let id = self.require_id()?;
        self.board()?
            .card_labels()?
            .into_iter()
            .filter(|cl| cl.label_id.as_deref() == Some(id))
            .map(|cl| cl.card())
            .collect()
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        let path = format!("/api/labels/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok(self.clone())
    }
}
