//! Group model: a named, optionally password-protected room with a
//! bounded message cache.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::crypto::sha256_hex;
use crate::store::errors::{StoreError, StoreResult};
use crate::store::message::Message;
use crate::validate;

/// A chat group.
///
/// The name and password hash are immutable after creation. The message
/// cache is the contended resource: every connection appending or
/// listing messages goes through the one mutex, so readers never observe
/// a half-evicted cache. None of the critical sections block or await.
pub struct Group {
    name: String,
    hashed_password: String,
    cache_size: usize,
    max_output: usize,
    messages: Mutex<VecDeque<Message>>,
}

impl Group {
    /// Create a group, hashing its password.
    ///
    /// An empty password leaves the stored hash empty, which marks the
    /// group as open: [`verify_password`] then accepts anything.
    ///
    /// [`verify_password`]: Group::verify_password
    pub fn new(
        name: impl Into<String>,
        password: &str,
        cache_size: usize,
        max_output: usize,
    ) -> StoreResult<Self> {
        let name = name.into();
        if !validate::is_valid_name(&name) || !validate::is_valid_name(password) {
            return Err(StoreError::InvalidArgument(
                "invalid group name or password".to_string(),
            ));
        }
        let hashed_password = if password.is_empty() {
            String::new()
        } else {
            sha256_hex(password)
        };
        Ok(Group {
            name,
            hashed_password,
            cache_size,
            max_output,
            messages: Mutex::new(VecDeque::with_capacity(cache_size)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a client-supplied password hash against the stored one.
    ///
    /// Exact string equality; an empty stored hash (open group) always
    /// passes.
    pub fn verify_password(&self, hashed_password: &str) -> bool {
        self.hashed_password.is_empty() || self.hashed_password == hashed_password
    }

    /// Append a message, evicting the single oldest entry if the cache
    /// would exceed its capacity.
    pub fn add_message(&self, message: Message) {
        let mut messages = self.messages.lock().expect("group cache lock poisoned");
        messages.push_back(message);
        if messages.len() > self.cache_size {
            messages.pop_front();
        }
    }

    /// All cached messages tagged with `topic`, rendered one per line in
    /// cache order.
    pub fn messages_for_topic(&self, topic: &str) -> String {
        let messages = self.messages.lock().expect("group cache lock poisoned");
        let mut output = String::new();
        for message in messages.iter().filter(|m| m.topic() == topic) {
            output.push_str(&message.to_string());
            output.push('\n');
        }
        output
    }

    /// All cached messages across topics, rendered one per line in cache
    /// order, capped at the configured output limit.
    pub fn all_messages(&self) -> String {
        let messages = self.messages.lock().expect("group cache lock poisoned");
        let mut output = String::new();
        for message in messages.iter().take(self.max_output) {
            output.push_str(&message.to_string());
            output.push('\n');
        }
        output
    }

    /// Distinct topics among cached messages, in first-seen order, one
    /// per line, each wrapped in single quotes.
    pub fn topics(&self) -> String {
        let messages = self.messages.lock().expect("group cache lock poisoned");
        let mut topics: Vec<&str> = Vec::new();
        for message in messages.iter() {
            if !topics.contains(&message.topic()) {
                topics.push(message.topic());
            }
        }
        let mut output = String::new();
        for topic in topics {
            output.push('\'');
            output.push_str(topic);
            output.push_str("'\n");
        }
        output
    }

    /// Number of cached messages.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("group cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
