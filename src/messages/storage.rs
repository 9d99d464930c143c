use super::types::Message;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// Append-only, ordered log of the turns in the current session
#[derive(Debug, Clone)]
pub struct SessionLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a message. Returns false (and drops it) if the id is already taken.
    pub fn append(&self, message: Message) -> bool {
        let mut messages = self.messages.write();
        if messages.iter().any(|m| m.id == message.id) {
            warn!("Dropping message with duplicate id {}", message.id);
            return false;
        }
        messages.push(message);
        true
    }

    /// Append a message only if the log holds nothing yet
    pub fn append_if_empty(&self, message: Message) -> bool {
        let mut messages = self.messages.write();
        if !messages.is_empty() {
            return false;
        }
        messages.push(message);
        true
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Message> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Role;

    #[test]
    fn test_append_keeps_insertion_order() {
        let log = SessionLog::new();
        log.append(Message::user("first"));
        log.append(Message::model("second"));

        let messages = log.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].text, "second");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let log = SessionLog::new();
        assert!(log.append(Message::model("a").with_id("x")));
        assert!(!log.append(Message::model("b").with_id("x")));
        assert_eq!(log.len(), 1);
        assert_eq!(log.get("x").unwrap().text, "a");
    }

    #[test]
    fn test_append_if_empty() {
        let log = SessionLog::new();
        assert!(log.append_if_empty(Message::model("greeting")));
        assert!(!log.append_if_empty(Message::model("second greeting")));

        let log = SessionLog::new();
        log.append(Message::user("question"));
        assert!(!log.append_if_empty(Message::model("greeting")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let log = SessionLog::new();
        let reader = log.clone();
        log.append(Message::user("hi"));
        assert!(!reader.is_empty());
        assert_eq!(reader.last().unwrap().text, "hi");
    }
}
