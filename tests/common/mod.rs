#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quizengine::config::EngineConfig;
use quizengine::database::quiz::{Answer, Question};
use quizengine::engine::error::{EngineError, EngineResult};
use quizengine::engine::gateway::{MessagingGateway, OutboundPoll};
use quizengine::engine::sequencer::SequenceCompletion;
use quizengine::engine::session::{InMemSessionStore, SessionState};
use quizengine::engine::QuizEngine;
use teloxide::types::{ChatId, MessageId};

#[derive(Debug, Clone)]
pub enum Sent {
    Message { chat_id: ChatId, text: String },
    Photo { chat_id: ChatId, image: String },
    Poll { chat_id: ChatId, poll: OutboundPoll },
}

/// Records everything sent; deleting an unknown or already deleted message
/// fails the way the Bot API does.
#[derive(Default)]
pub struct MockGateway {
    next_id: AtomicI32,
    pub sent: Mutex<Vec<(MessageId, Sent)>>,
    alive: Mutex<HashSet<i32>>,
    pub deleted: Mutex<Vec<MessageId>>,
    pub failing_polls: Mutex<HashSet<ChatId>>,
}

impl MockGateway {
    fn store(&self, sent: Sent) -> MessageId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.alive.lock().unwrap().insert(id);
        self.sent.lock().unwrap().push((MessageId(id), sent));
        MessageId(id)
    }

    pub fn polls(&self, chat: ChatId) -> Vec<OutboundPoll> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, sent)| match sent {
                Sent::Poll { chat_id, poll } if *chat_id == chat => Some(poll.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, sent)| match sent {
                Sent::Message { chat_id, text } if *chat_id == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> EngineResult<MessageId> {
        Ok(self.store(Sent::Message {
            chat_id,
            text: text.to_owned(),
        }))
    }

    async fn send_photo(&self, chat_id: ChatId, image: &str) -> EngineResult<MessageId> {
        Ok(self.store(Sent::Photo {
            chat_id,
            image: image.to_owned(),
        }))
    }

    async fn send_poll(&self, chat_id: ChatId, poll: &OutboundPoll) -> EngineResult<MessageId> {
        if self.failing_polls.lock().unwrap().contains(&chat_id) {
            return Err(EngineError::Transport("Too Many Requests".into()));
        }
        Ok(self.store(Sent::Poll {
            chat_id,
            poll: poll.clone(),
        }))
    }

    async fn delete_message(&self, _chat_id: ChatId, message_id: MessageId) -> EngineResult<()> {
        if self.alive.lock().unwrap().remove(&message_id.0) {
            self.deleted.lock().unwrap().push(message_id);
            Ok(())
        } else {
            Err(EngineError::Transport("message to delete not found".into()))
        }
    }
}

#[derive(Default)]
pub struct RecordingCompletion {
    pub calls: Mutex<Vec<(ChatId, SessionState)>>,
}

impl RecordingCompletion {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn session(&self, chat: ChatId) -> Option<SessionState> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(chat_id, _)| *chat_id == chat)
            .map(|(_, session)| session.clone())
    }
}

#[async_trait]
impl SequenceCompletion for RecordingCompletion {
    async fn on_sequence_complete(&self, chat_id: ChatId, session: &SessionState) {
        self.calls.lock().unwrap().push((chat_id, session.clone()));
    }
}

pub struct Harness {
    pub engine: QuizEngine,
    pub gateway: Arc<MockGateway>,
    pub sessions: Arc<InMemSessionStore>,
    pub completion: Arc<RecordingCompletion>,
}

pub const GRACE: Duration = Duration::from_millis(500);

pub fn test_config() -> EngineConfig {
    EngineConfig {
        cleanup_batch_size: 10,
        cleanup_batch_pause: Duration::from_millis(100),
        timeout_grace: GRACE,
        completed_capacity: 100,
    }
}

pub fn harness() -> Harness {
    let gateway = Arc::new(MockGateway::default());
    let sessions = Arc::new(InMemSessionStore::new());
    let engine = QuizEngine::new(gateway.clone(), sessions.clone(), test_config());
    Harness {
        engine,
        gateway,
        sessions,
        completion: Arc::new(RecordingCompletion::default()),
    }
}

/// A question whose first option is the correct one.
pub fn question(text: &str, limit_secs: u64, topic: &str) -> Question {
    Question::new(
        text,
        Duration::from_secs(limit_secs),
        topic,
        vec![
            Answer::new("right", true),
            Answer::new("wrong", false),
            Answer::new("also wrong", false),
        ],
    )
}
