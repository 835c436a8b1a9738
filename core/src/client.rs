//! Root entry point for a Planka session.
//!
//! # Design
//! `Planka` holds only the authenticated `Routes`. Authentication happens
//! once at construction: the `Auth` implementation is handed an
//! unauthenticated session on the same transport and returns the header
//! value every later request carries. Everything reachable from here is
//! fetched fresh on each call and comes back bound to this session.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::auth::Auth;
use crate::config::Config;
use crate::constants::{random_choice, GRADIENTS};
use crate::error::{ApiError, Result};
use crate::http::Transport;
use crate::overload::{resolve, Args};
use crate::record::{FieldMap, Record};
use crate::resources::{Board, Card, Notification, Project, User};
use crate::routes::{take_item, Routes};

#[derive(Debug, Clone)]
pub struct Planka {
    routes: Routes,
}

impl Planka {
    /// Connect over the default blocking transport.
    #[cfg(feature = "ureq")]
    pub fn new(url: &str, auth: &dyn Auth) -> Result<Self> {
        Self::with_transport(url, Arc::new(crate::transport::UreqTransport::default()), auth)
    }

    /// Connect using settings from `config`, honouring its timeout.
    #[cfg(feature = "ureq")]
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = crate::transport::UreqTransport::new(config.timeout());
        Self::with_config_and_transport(config, Arc::new(transport))
    }

    pub fn with_config_and_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let auth = config.auth()?;
        Self::with_transport(&config.url, transport, auth.as_ref())
    }

    pub fn with_transport(url: &str, transport: Arc<dyn Transport>, auth: &dyn Auth) -> Result<Self> {
        let anonymous = Routes::new(url, transport, None);
        let authorization = auth.authenticate(&anonymous)?;
        debug!(url = anonymous.base_url(), "planka session established");
        Ok(Self {
            routes: anonymous.with_authorization(authorization),
        })
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn url(&self) -> &str {
        self.routes.base_url()
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.routes.items("/api/projects")
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.routes.items("/api/users")
    }

    /// Notifications for the logged-in user.
    pub fn notifications(&self) -> Result<Vec<Notification>> {
        self.routes.items("/api/notifications")
    }

    pub fn me(&self) -> Result<User> {
        self.routes.item("/api/users/me")
    }

    /// Server configuration, returned as Planka sends it.
    pub fn config(&self) -> Result<Value> {
        const PATH: &str = "/api/config";
        take_item(self.routes.get(PATH)?, PATH)
    }

    pub fn project(&self, id: &str) -> Result<Project> {
        self.routes.item(&format!("/api/projects/{id}"))
    }

    pub fn board(&self, id: &str) -> Result<Board> {
        self.routes.item(&format!("/api/boards/{id}"))
    }

    pub fn card(&self, id: &str) -> Result<Card> {
        self.routes.item(&format!("/api/cards/{id}"))
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.routes.item(&format!("/api/users/{id}"))
    }

    pub fn notification(&self, id: &str) -> Result<Notification> {
        self.routes.item(&format!("/api/notifications/{id}"))
    }

    /// Options: `name`, `position` (default 0), `background` (gradient name),
    /// `backgroundImage`. Accepts a `Project` record. Without a background a
    /// random gradient is picked.
    pub fn create_project(&self, args: Args) -> Result<Project> {
        let mut fields = resolve(
            args,
            Project::NAME,
            &["name", "position", "background", "backgroundImage"],
            &["name"],
            None,
        )?;
        crate::resources::insert_default(&mut fields, "position", 0);
        match fields.get("background") {
            None | Some(Value::Null) => {
                let gradient = random_choice(GRADIENTS);
                fields.insert("background".to_string(), json!({ "name": gradient, "type": "gradient" }));
            }
            Some(_) => crate::resources::normalize_background(&mut fields)?,
        }
        self.routes.create("/api/projects", &fields)
    }

    /// Options: `username`, `email`, `password`, `name` (defaults to the
    /// username). Accepts a `User` record.
    ///
    /// Usernames and emails already taken are rejected before the request.
    pub fn create_user(&self, args: Args) -> Result<User> {
        let mut fields = resolve(
            args,
            User::NAME,
            &["username", "email", "password", "name"],
            &["username", "email", "password"],
            None,
        )?;
        let username = text_of(&fields, "username");
        let email = text_of(&fields, "email");
        if !fields.contains_key("name") {
            fields.insert("name".to_string(), Value::String(username.clone()));
        }

        for existing in self.users()? {
            if existing.username.as_deref() == Some(username.as_str()) {
                return Err(ApiError::validation(format!("username '{username}' is already taken")));
            }
            if existing.email.as_deref() == Some(email.as_str()) {
                return Err(ApiError::validation(format!("email '{email}' is already in use")));
            }
        }

        match self.routes.create("/api/users", &fields) {
            Err(ApiError::Http { status: 400, body, .. }) => Err(ApiError::validation(format!(
                "Planka rejected the new user; the password is probably too weak. \
                 Use at least 8 characters mixing letters, digits and symbols. Server said: {body}"
            ))),
            other => other,
        }
    }

    /// Invalidate the session token.
    pub fn logout(self) -> Result<()> {
        self.routes.delete("/api/access-tokens/me")?;
        Ok(())
    }
}

fn text_of(fields: &FieldMap, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::auth::{PasswordAuth, TokenAuth};
    use crate::testing::{body_json, MockTransport, BASE_URL};

    fn planka(mock: &Arc<MockTransport>) -> Planka {
        Planka::with_transport(BASE_URL, mock.clone(), &TokenAuth::new("test-token")).unwrap()
    }

    #[test]
    fn password_login_sets_authorization() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"item": "tok"}));
        let p = Planka::with_transport(BASE_URL, mock.clone(), &PasswordAuth::new("demo", "demo")).unwrap();
        mock.push_item(json!({"id": "1", "name": "Demo", "email": "demo@demo.demo"}));
        p.me().unwrap();
        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/users/me"));
        assert_eq!(req.header_value("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn project_without_background_gets_random_gradient() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_item(json!({"id": "1", "name": "Demo", "background": {"type": "gradient", "name": "ocean-dive"}}));
        p.create_project(args!("Demo")).unwrap();

        let sent = body_json(&mock.last_request().unwrap());
        assert_eq!(sent["name"], json!("Demo"));
        assert_eq!(sent["position"], json!(0));
        assert_eq!(sent["background"]["type"], json!("gradient"));
        let gradient = sent["background"]["name"].as_str().unwrap();
        assert!(GRADIENTS.contains(&gradient));
    }

    #[test]
    fn project_gradient_is_wrapped() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_item(json!({"id": "1", "name": "Demo"}));
        p.create_project(args!("Demo", background = "jungle-mesh")).unwrap();
        assert_eq!(
            body_json(&mock.last_request().unwrap())["background"],
            json!({"name": "jungle-mesh", "type": "gradient"})
        );

        let err = p.create_project(args!("Demo", background = "plaid")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidValue { .. }));
    }

    #[test]
    fn duplicate_username_is_rejected_locally() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_json(200, json!({"items": [{"id": "1", "name": "Demo", "username": "demo", "email": "demo@x.io"}]}));
        let err = p
            .create_user(args!(username = "demo", email = "new@x.io", password = "S3cure-enough!"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("demo")));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn weak_password_becomes_validation() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_json(200, json!({"items": []}));
        mock.push_json(400, json!({"code": "E_MISSING_OR_INVALID_PARAMS"}));
        let err = p.create_user(args!("ann", "ann@x.io", "123")).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("password")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn user_name_defaults_to_username() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_json(200, json!({"items": []}));
        mock.push_item(json!({"id": "9", "name": "ann", "username": "ann", "email": "ann@x.io"}));
        p.create_user(args!("ann", "ann@x.io", "S3cure-enough!")).unwrap();
        assert_eq!(body_json(&mock.last_request().unwrap())["name"], json!("ann"));
    }

    #[test]
    fn server_errors_other_than_400_pass_through() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_json(200, json!({"items": []}));
        mock.push_json(409, json!({"code": "E_CONFLICT"}));
        let err = p.create_user(args!("ann", "ann@x.io", "S3cure-enough!")).unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn config_returns_item() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_item(json!({"oidc": null}));
        assert_eq!(p.config().unwrap(), json!({"oidc": null}));
    }

    #[test]
    fn logout_deletes_token() {
        let mock = MockTransport::new();
        let p = planka(&mock);
        mock.push_json(200, json!({"item": "tok"}));
        p.logout().unwrap();
        assert_eq!(mock.calls(), vec![("DELETE".to_string(), "/api/access-tokens/me".to_string())]);
    }

    #[test]
    fn config_without_credentials_fails_before_any_request() {
        let mock = MockTransport::new();
        let err = Planka::with_config_and_transport(&Config::new(BASE_URL), mock.clone()).unwrap_err();
        assert!(err.is_local());
        assert_eq!(mock.request_count(), 0);
    }
}
