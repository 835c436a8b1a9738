//! Card checklist tasks.

use serde::{Deserialize, Serialize};

use super::{foreign_key, Card};
use crate::error::Result;
use crate::field::Field;
use crate::overload::Args;
use crate::position;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

/// Checklist item on a card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Task {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent", deserialize_with = "position::lenient")]
    pub position: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_completed: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Task, "task", required: [name, position], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["name", "isCompleted", "position"])?;
        let path = format!("/api/tasks/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let tasks = self.card()?.board()?.tasks()?;
        self.rescan(tasks)
    }
});

impl Task {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            position: Field::Required,
            ..Default::default()
        }
    }

    pub fn card(&self) -> Result<Card> {
        let id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        self.routes()?.item(&format!("/api/cards/{id}"))
    }

    pub fn complete(&mut self) -> Result<()> {
        self.update(Args::new().kw("isCompleted", true))
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        let path = format!("/api/tasks/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok(self.clone())
    }
}
