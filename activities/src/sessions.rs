use crate::types::{AccessToken, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Bearer tokens of the users who completed the OAuth flow, keyed by the user
/// id carried in their session cookie. Lost on restart.
#[derive(Default)]
pub struct SessionStore {
    tokens: RwLock<HashMap<UserId, AccessToken>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the token for a user, replacing any previous one.
    pub fn insert(&self, user_id: &str, token: AccessToken) {
        self.tokens.write().insert(user_id.to_string(), token);
    }

    pub fn token(&self, user_id: &str) -> Option<AccessToken> {
        self.tokens.read().get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
