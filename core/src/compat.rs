//! Older username/password entry points, kept for existing callers.

use std::sync::{Arc, Once};

use tracing::warn;

use crate::auth::PasswordAuth;
use crate::client::Planka;
use crate::error::Result;
use crate::http::Transport;

static WARNED: Once = Once::new();

fn warn_once() {
    WARNED.call_once(|| {
        warn!("compat::connect is deprecated; build a PasswordAuth and call Planka::new");
    });
}

#[cfg(feature = "ureq")]
#[deprecated(since = "0.1.0", note = "use `Planka::new(url, &PasswordAuth::new(username, password))`")]
pub fn connect(url: &str, username: &str, password: &str) -> Result<Planka> {
    warn_once();
    Planka::new(url, &PasswordAuth::new(username, password))
}

#[deprecated(
    since = "0.1.0",
    note = "use `Planka::with_transport(url, transport, &PasswordAuth::new(username, password))`"
)]
pub fn connect_with(url: &str, transport: Arc<dyn Transport>, username: &str, password: &str) -> Result<Planka> {
    warn_once();
    Planka::with_transport(url, transport, &PasswordAuth::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, BASE_URL};
    use serde_json::json;

    #[test]
    #[allow(deprecated)]
    fn shim_still_logs_in() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"item": "tok"}));
        let planka = connect_with(BASE_URL, mock.clone(), "demo", "demo").unwrap();
        assert_eq!(planka.url(), BASE_URL);
        assert!(planka.routes().is_authorized());
        assert!(WARNED.is_completed());
    }
}
