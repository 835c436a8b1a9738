//! Card attachments. Downloads go through the session so the bearer token
//! is sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{foreign_key, Card, User};
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::overload::Args;
use crate::record::{impl_record, Id, Record};
use crate::routes::Routes;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub dirname: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub filename: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub image: Field<Value>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub url: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub cover_url: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub card_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub creator_user_id: Field<Id>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<String>,
    #[serde(skip)]
    routes: Option<Routes>,
}

impl_record!(Attachment, "attachment", required: [name, card_id], {
    fn update(&mut self, args: Args) -> Result<()> {
        let fields = self.resolve_update(args, &["name"])?;
        let path = format!("/api/attachments/{}", self.require_id()?);
        self.push(&path, &fields)
    }

    fn refresh(&mut self) -> Result<()> {
        let attachments = self.card()?.attachments()?;
        self.rescan(attachments)
    }
});

impl Attachment {
    pub fn card(&self) -> Result<Card> {
        let id = foreign_key(Self::NAME, "cardId", &self.card_id)?;
        self.routes()?.item(&format!("/api/cards/{id}"))
    }

    pub fn creator(&self) -> Result<User> {
        let id = foreign_key(Self::NAME, "creatorUserId", &self.creator_user_id)?;
        self.routes()?.item(&format!("/api/users/{id}"))
    }

    /// Raw file contents.
    pub fn download(&self) -> Result<Vec<u8>> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| ApiError::validation("attachment has no download url"))?;
        self.routes()?.get_file(url)
    }

    pub fn delete(&mut self) -> Result<Self> {
        self.refresh()?;
        let path = format!("/api/attachments/{}", self.require_id()?);
        self.routes()?.delete(&path)?;
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::http::HttpResponse;
    use crate::testing::{body_json, MockTransport};
    use serde_json::json;

    fn attachment(mock: &std::sync::Arc<MockTransport>) -> Attachment {
        mock.routes()
            .decode(json!({
                "id": "500",
                "name": "brief.pdf",
                "url": "http://planka.test/attachments/500/download/brief.pdf",
                "cardId": "100",
                "creatorUserId": "7"
            }))
            .unwrap()
    }

    #[test]
    fn download_returns_bytes_with_auth() {
        let mock = MockTransport::new();
        mock.push(HttpResponse::new(200, b"%PDF-1.7".to_vec()));
        let bytes = attachment(&mock).download().unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        let req = mock.last_request().unwrap();
        assert_eq!(req.url, "http://planka.test/attachments/500/download/brief.pdf");
        assert_eq!(req.header_value("authorization"), Some("Bearer test-token"));
    }

    #[test]
    fn download_without_url_fails_locally() {
        let mock = MockTransport::new();
        let a: Attachment = mock.routes().decode(json!({"id": "1", "name": "x", "cardId": "1"})).unwrap();
        assert!(a.download().unwrap_err().is_local());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn rename_patches_name() {
        let mock = MockTransport::new();
        let mut a = attachment(&mock);
        mock.push_item(json!({"id": "500", "name": "final.pdf", "cardId": "100"}));
        a.update(args!(name = "final.pdf")).unwrap();
        assert_eq!(body_json(&mock.last_request().unwrap()), json!({"name": "final.pdf"}));
        assert_eq!(a.name.as_deref(), Some("final.pdf"));
    }
}
