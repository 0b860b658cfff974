//! Shared helpers for paperhub integration tests

use paperhub_core::{Mutations, SqlitePaperStore};

/// In-memory store with one account per name; each password is the username.
pub fn store_with_users(users: &[&str]) -> SqlitePaperStore {
    let store = SqlitePaperStore::open_in_memory().unwrap();
    for user in users {
        store.signup(user, user).unwrap();
    }
    store
}
