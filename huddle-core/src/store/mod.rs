//! Shared group/message store.
//!
//! One [`GroupStore`] lives for the whole server process and is read and
//! written by every connection worker. Groups are created at startup (at
//! least the default group) and by explicit provisioning; they are never
//! deleted. Each group's message cache serializes its own access, so no
//! store-wide lock is needed on the hot path.

pub mod errors;
pub mod group;
pub mod message;

pub use errors::{StoreError, StoreResult};
pub use group::Group;
pub use message::Message;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::validate;

/// Thread-shared collection of groups, keyed by unique name.
pub struct GroupStore {
    cache_size: usize,
    max_output: usize,
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupStore {
    /// Create an empty store whose groups will use the given message
    /// cache capacity and all-topics output cap.
    pub fn new(cache_size: usize, max_output: usize) -> Self {
        GroupStore {
            cache_size,
            max_output,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Create and register a group.
    ///
    /// Rejects unsafe text in either argument and duplicate names. The
    /// group hashes its own password.
    pub fn create_group(&self, name: &str, password: &str) -> StoreResult<()> {
        if !validate::is_safe_text(name) || !validate::is_safe_text(password) {
            return Err(StoreError::InvalidArgument(
                "unsafe group name or password".to_string(),
            ));
        }
        let group = Group::new(name, password, self.cache_size, self.max_output)?;

        let mut groups = self.groups.write().expect("group store lock poisoned");
        if groups.contains_key(name) {
            return Err(StoreError::GroupExists(name.to_string()));
        }
        groups.insert(name.to_string(), Arc::new(group));
        info!(group = %name, "group created");
        Ok(())
    }

    /// Look up a group by name.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups
            .read()
            .expect("group store lock poisoned")
            .get(name)
            .cloned()
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.read().expect("group store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;

    #[test]
    fn test_create_then_get_roundtrip() {
        let store = GroupStore::new(100, 50);
        store.create_group("general", "hunter2").unwrap();

        let group = store.get_group("general").expect("group should exist");
        assert_eq!(group.name(), "general");
        assert!(group.verify_password(&sha256_hex("hunter2")));
        assert!(!group.verify_password(&sha256_hex("other")));
    }

    #[test]
    fn test_missing_group_is_absent() {
        let store = GroupStore::new(100, 50);
        assert!(store.get_group("nowhere").is_none());
    }

    #[test]
    fn test_rejects_duplicates() {
        let store = GroupStore::new(100, 50);
        store.create_group("general", "pw").unwrap();
        assert!(matches!(
            store.create_group("general", "other"),
            Err(StoreError::GroupExists(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_names() {
        let store = GroupStore::new(100, 50);
        assert!(store.create_group("caf\u{e9}", "pw").is_err());
        assert!(store.create_group(&"g".repeat(41), "pw").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_appends_no_lost_update() {
        let store = Arc::new(GroupStore::new(1000, 100));
        store.create_group("busy", "pw").unwrap();

        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let group = store.get_group("busy").unwrap();
                for i in 0..50 {
                    let message =
                        Message::new("default", format!("w{worker}"), format!("m{i}")).unwrap();
                    group.add_message(message);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_group("busy").unwrap().len(), 400);
    }
}
