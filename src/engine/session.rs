use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::quiz::{Answer, Question};

use super::error::EngineResult;
use super::registry::InstanceId;

/// Outcome of one question of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResult {
    pub question_id: Uuid,
    /// `None` when the question timed out.
    pub selected_option: Option<Uuid>,
    pub is_correct: bool,
    pub time_spent: Duration,
    pub topic: String,
}

/// Per-chat state of a running question sequence.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub selection_key: String,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub score: u32,
    pub results: Vec<QuestionResult>,
    pub pending_message_ids: Vec<MessageId>,
    pub current_instance: Option<InstanceId>,
    /// Options of the current question in the order they were sent.
    pub current_options: Vec<Answer>,
}

impl SessionState {
    pub fn new(selection_key: impl Into<String>) -> Self {
        Self {
            selection_key: selection_key.into(),
            ..Default::default()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// Appends a result and moves on to the next question.
    pub fn record(&mut self, result: QuestionResult) {
        if result.is_correct {
            self.score += 1;
        }
        self.results.push(result);
        self.current_index += 1;
        self.current_instance = None;
        self.current_options.clear();
    }

    pub fn track_message(&mut self, message_id: MessageId) {
        self.pending_message_ids.push(message_id);
    }
}

/// Load/save contract between the engine and whoever owns the sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, chat_id: ChatId) -> EngineResult<Option<SessionState>>;

    async fn save(&self, chat_id: ChatId, session: &SessionState) -> EngineResult<()>;

    async fn clear(&self, chat_id: ChatId) -> EngineResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemSessionStore {
    sessions: Mutex<HashMap<ChatId, SessionState>>,
}

impl InMemSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemSessionStore {
    async fn load(&self, chat_id: ChatId) -> EngineResult<Option<SessionState>> {
        Ok(self.sessions.lock().await.get(&chat_id).cloned())
    }

    async fn save(&self, chat_id: ChatId, session: &SessionState) -> EngineResult<()> {
        self.sessions.lock().await.insert(chat_id, session.clone());
        Ok(())
    }

    async fn clear(&self, chat_id: ChatId) -> EngineResult<()> {
        self.sessions.lock().await.remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(is_correct: bool) -> QuestionResult {
        QuestionResult {
            question_id: Uuid::new_v4(),
            selected_option: None,
            is_correct,
            time_spent: Duration::from_secs(3),
            topic: "algebra".into(),
        }
    }

    #[test]
    fn record_advances_and_scores() {
        let mut session = SessionState::new("math");
        session.current_instance = Some(InstanceId::new());

        session.record(result(true));
        session.record(result(false));

        assert_eq!(session.current_index, 2);
        assert_eq!(session.score, 1);
        assert_eq!(session.results.len(), 2);
        assert!(session.current_instance.is_none());
    }

    #[tokio::test]
    async fn in_mem_store_is_keyed_by_chat() {
        let store = InMemSessionStore::new();
        store.save(ChatId(1), &SessionState::new("a")).await.unwrap();
        store.save(ChatId(2), &SessionState::new("b")).await.unwrap();

        store.clear(ChatId(1)).await.unwrap();

        assert!(store.load(ChatId(1)).await.unwrap().is_none());
        assert_eq!(
            store.load(ChatId(2)).await.unwrap().unwrap().selection_key,
            "b"
        );
    }
}
