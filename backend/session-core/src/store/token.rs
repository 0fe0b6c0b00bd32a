use super::{KeyValueStore, TOKEN_KEY};

use common::SessionToken;

use std::sync::Arc;

/// Typed access to the bearer token in the persistent scope.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn has_token(&self) -> bool {
        self.get_token().is_some()
    }

    /// An empty stored value counts as no token.
    pub fn get_token(&self) -> Option<SessionToken> {
        self.store
            .get(TOKEN_KEY)
            .filter(|value| !value.is_empty())
            .map(SessionToken::new)
    }

    pub fn set_token(&self, token: &SessionToken) {
        self.store.set(TOKEN_KEY, token.expose());
    }

    pub fn clear_token(&self) {
        self.store.remove(TOKEN_KEY);
    }

    /// Wipe the whole persistent scope, not just the token.
    pub(crate) fn clear_scope(&self) {
        self.store.clear();
    }
}
