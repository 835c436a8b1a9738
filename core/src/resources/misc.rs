//! Read-only records Planka side-loads but never lets clients edit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, Card, User};
use crate::error::Result;
use crate::field::Field;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardSubscription {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub is_permanent: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(CardSubscription, "cardSubscription", required: [card_id, user_id]);

impl CardSubscription {
    pub fn user(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "userId", &self.user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }

    pub fn card(&self) -> Result<Card> {
        let id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        self.routes()?.item(&format!("/api/cards/{id}"))
    }
}

/// Link between a Planka user and an external SSO identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityProviderUser {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub issuer: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub sub: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(IdentityProviderUser, "identityProviderUser", required: [user_id]);

impl IdentityProviderUser {
    pub fn user(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "userId", &self.user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }
}

/// Snapshot of a deleted record. Planka exposes no endpoints for archives,
/// so this only decodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Archive {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub from_model: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub original_record_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub original_record: Field<Value>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl Record for Archive {
    const NAME: &'static str = "archive";

    fn id(&self) -> Option<&str> {
        None
    }

    fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.from_model.is_required() {
            missing.push("fromModel".to_string());
        }
        if self.original_record_id.is_required() {
            missing.push("originalRecordId".to_string());
        }
        if self.original_record.is_required() {
            missing.push("originalRecord".to_string());
        }
        missing
    }

    fn routes_slot(&self) -> Option<&Routes> {
        self.routes.as_ref()
    }

    fn routes_slot_mut(&mut self) -> &mut Option<Routes> {
        &mut self.routes
    }
}

impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Archive {}

impl std::hash::Hash for Archive {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}
