use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A local record linking a caller session to a Pocket identity.
///
/// Pending accounts carry a `request_token`; linked accounts carry an
/// `access_token` and `username`. The store never holds both tokens at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// The unique identifier; protected, it doubles as the session token.
    pub id: Uuid,
    /// Where the caller wants the user sent once authorization completes.
    pub redirect_url: String,
    /// Pocket's short-lived request code, while authorization is pending.
    pub request_token: Option<String>,
    /// Pocket's long-lived access token, once linked.
    pub access_token: Option<String>,
    /// The Pocket username, once linked.
    pub username: Option<String>,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A fresh account that has not yet been issued a request code.
    pub fn pending(redirect_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            redirect_url: redirect_url.into(),
            request_token: None,
            access_token: None,
            username: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records a Pocket grant, ending the pending state.
    pub fn link(&mut self, access_token: String, username: String) {
        self.access_token = Some(access_token);
        self.username = Some(username);
        self.request_token = None;
    }
}
