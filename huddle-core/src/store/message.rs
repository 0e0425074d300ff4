//! Message model.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::store::errors::{StoreError, StoreResult};
use crate::validate;

/// A single message in a group's cache.
///
/// Immutable after construction; validated at construction. Owned
/// exclusively by the group cache that holds it.
#[derive(Debug, Clone)]
pub struct Message {
    topic: String,
    user: String,
    body: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message, validating all fields.
    ///
    /// Topic and user must be well-formed names, the body a well-formed
    /// message. The timestamp is taken at construction.
    pub fn new(
        topic: impl Into<String>,
        user: impl Into<String>,
        body: impl Into<String>,
    ) -> StoreResult<Self> {
        let (topic, user, body) = (topic.into(), user.into(), body.into());
        if !validate::is_valid_name(&topic) || !validate::is_valid_name(&user) {
            return Err(StoreError::InvalidArgument(
                "invalid message topic or user".to_string(),
            ));
        }
        if !validate::is_valid_message(&body) {
            return Err(StoreError::InvalidArgument(
                "invalid message body".to_string(),
            ));
        }
        Ok(Message {
            topic,
            user,
            body,
            timestamp: Utc::now(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for Message {
    /// Renders the single-line form served to clients:
    /// `{topic} (timestamp) [user]: body`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}} ({}) [{}]: {}",
            self.topic,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.user,
            self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_message() {
        let msg = Message::new("news", "alice", "hello there").unwrap();
        assert_eq!(msg.topic(), "news");
        assert_eq!(msg.user(), "alice");
        assert_eq!(msg.body(), "hello there");
    }

    #[test]
    fn test_rejects_bad_fields() {
        assert!(Message::new("a\nb", "alice", "hi").is_err());
        assert!(Message::new("news", &"x".repeat(41), "hi").is_err());
        assert!(Message::new("news", "alice", &"x".repeat(401)).is_err());
    }

    #[test]
    fn test_display_format() {
        let msg = Message::new("news", "alice", "hello").unwrap();
        let line = msg.to_string();
        assert!(line.starts_with("{news} ("));
        assert!(line.ends_with("[alice]: hello"));
    }
}
