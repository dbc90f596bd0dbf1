//! In-memory conversation store. Not persistent; for dev and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ConversationStore, SessionRecord, SessionSummary, StoreError};

/// In-memory store keyed by (user_id, session_id).
#[derive(Default)]
pub struct InMemoryStore {
    sessions: DashMap<(String, String), SessionRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, user_id: &str, session_id: &str) -> Result<SessionRecord, StoreError> {
        Ok(self
            .sessions
            .get(&(user_id.to_string(), session_id.to_string()))
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn save(
        &self,
        user_id: &str,
        session_id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        self.sessions.insert(
            (user_id.to_string(), session_id.to_string()),
            record.clone(),
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.retain(|(_, sid), _| sid != session_id);
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        let mut sessions: Vec<SessionSummary> = self
            .sessions
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| SessionSummary {
                session_id: entry.key().1.clone(),
                title: entry.value().title.clone(),
            })
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    /// **Scenario**: Unknown sessions load as empty records; saved records
    /// round-trip; delete removes the session for every user.
    #[tokio::test]
    async fn load_save_delete() {
        let store = InMemoryStore::new();
        let empty = store.load("u1", "s1").await.unwrap();
        assert!(empty.messages.is_empty());

        let mut record = SessionRecord::default();
        record.messages.push(Message::user("hi"));
        record.title = "Greetings".into();
        store.save("u1", "s1", &record).await.unwrap();

        let loaded = store.load("u1", "s1").await.unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.title, "Greetings");

        let listed = store.list_sessions("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Greetings");

        store.delete("s1").await.unwrap();
        assert!(store.load("u1", "s1").await.unwrap().messages.is_empty());
    }
}
