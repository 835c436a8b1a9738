//! Credentials that produce an `Authorization` header value.

use std::fmt;

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::record::FieldMap;
use crate::routes::{take_item, Routes};

pub trait Auth {
    /// Exchange credentials for a header value, using an unauthenticated
    /// session on the target server.
    fn authenticate(&self, routes: &Routes) -> Result<String>;
}

/// Username (or email) and password, exchanged for a bearer token.
#[derive(Clone)]
pub struct PasswordAuth {
    username: String,
    password: String,
}

impl PasswordAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Auth for PasswordAuth {
    fn authenticate(&self, routes: &Routes) -> Result<String> {
        const PATH: &str = "/api/access-tokens";
        let mut body = FieldMap::new();
        body.insert("emailOrUsername".to_string(), Value::String(self.username.clone()));
        body.insert("password".to_string(), Value::String(self.password.clone()));
        match take_item(routes.post(PATH, &body)?, PATH)? {
            Value::String(token) => Ok(format!("Bearer {token}")),
            other => Err(ApiError::unexpected(PATH, format!("token is not a string: {other}"))),
        }
    }
}

/// A token issued out of band.
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth").field("token", &"<redacted>").finish()
    }
}

impl Auth for TokenAuth {
    fn authenticate(&self, _routes: &Routes) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, MockTransport, BASE_URL};
    use serde_json::json;

    #[test]
    fn password_auth_exchanges_for_bearer() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"item": "abc.def"}));
        let routes = Routes::new(BASE_URL, mock.clone(), None);
        let header = PasswordAuth::new("demo", "demo").authenticate(&routes).unwrap();
        assert_eq!(header, "Bearer abc.def");

        let req = mock.last_request().unwrap();
        assert!(req.header_value("authorization").is_none());
        assert_eq!(body_json(&req), json!({"emailOrUsername": "demo", "password": "demo"}));
    }

    #[test]
    fn rejected_login_surfaces_status() {
        let mock = MockTransport::new();
        mock.push_json(401, json!({"code": "E_UNAUTHORIZED"}));
        let routes = Routes::new(BASE_URL, mock.clone(), None);
        let err = PasswordAuth::new("demo", "wrong").authenticate(&routes).unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn token_auth_sends_nothing() {
        let mock = MockTransport::new();
        let routes = Routes::new(BASE_URL, mock.clone(), None);
        assert_eq!(TokenAuth::new("t0k").authenticate(&routes).unwrap(), "Bearer t0k");
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn debug_hides_secrets() {
        let shown = format!("{:?} {:?}", PasswordAuth::new("demo", "hunter22"), TokenAuth::new("t0k"));
        assert!(!shown.contains("hunter22"));
        assert!(!shown.contains("t0k"));
    }
}
