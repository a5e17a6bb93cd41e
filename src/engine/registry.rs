use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use teloxide::types::ChatId;
use tokio::time::Instant;
use uuid::Uuid;

use super::sequencer::SequenceCompletion;

/// Opaque identity of one emitted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for InstanceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Clone)]
pub struct QuestionInstance {
    pub instance_id: InstanceId,
    pub chat_id: ChatId,
    pub question_id: Uuid,
    pub answered: bool,
    pub start_time: Instant,
    pub time_limit: Duration,
    pub completion: Arc<dyn SequenceCompletion>,
}

impl fmt::Debug for QuestionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionInstance")
            .field("instance_id", &self.instance_id)
            .field("chat_id", &self.chat_id)
            .field("question_id", &self.question_id)
            .field("answered", &self.answered)
            .field("time_limit", &self.time_limit)
            .finish_non_exhaustive()
    }
}

/// Pending question instances. Presence in the registry means the instance
/// is still waiting for its single resolution.
#[derive(Debug, Default)]
pub struct ActiveQuestions {
    instances: Mutex<HashMap<InstanceId, QuestionInstance>>,
}

impl ActiveQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another task panicked mid-insert; the map
    // itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<InstanceId, QuestionInstance>> {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, instance: QuestionInstance) {
        self.lock().insert(instance.instance_id, instance);
    }

    pub fn get(&self, instance_id: &InstanceId) -> Option<QuestionInstance> {
        self.lock().get(instance_id).cloned()
    }

    pub fn remove(&self, instance_id: &InstanceId) {
        self.lock().remove(instance_id);
    }

    /// Flips `answered` from false to true. Only the first caller for an
    /// instance gets `true`.
    pub fn mark_answered(&self, instance_id: &InstanceId) -> bool {
        match self.lock().get_mut(instance_id) {
            Some(instance) if !instance.answered => {
                instance.answered = true;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::SessionState;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl SequenceCompletion for Noop {
        async fn on_sequence_complete(&self, _chat_id: ChatId, _session: &SessionState) {}
    }

    fn instance() -> QuestionInstance {
        QuestionInstance {
            instance_id: InstanceId::new(),
            chat_id: ChatId(7),
            question_id: Uuid::new_v4(),
            answered: false,
            start_time: Instant::now(),
            time_limit: Duration::from_secs(30),
            completion: Arc::new(Noop),
        }
    }

    #[test]
    fn instance_id_round_trips_through_callback_text() {
        let id = InstanceId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<InstanceId>().unwrap(), id);
        assert!("not-an-id".parse::<InstanceId>().is_err());
    }

    #[test]
    fn mark_answered_flips_once() {
        let registry = ActiveQuestions::new();
        let question = instance();
        let id = question.instance_id;
        registry.register(question);

        assert!(registry.mark_answered(&id));
        assert!(!registry.mark_answered(&id));
        assert!(registry.get(&id).unwrap().answered);
    }

    #[test]
    fn mark_answered_on_absent_instance_is_false() {
        let registry = ActiveQuestions::new();
        assert!(!registry.mark_answered(&InstanceId::new()));
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let registry = Arc::new(ActiveQuestions::new());
        let question = instance();
        let id = question.instance_id;
        registry.register(question);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.mark_answered(&id))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn clear_drops_everything() {
        let registry = ActiveQuestions::new();
        registry.register(instance());
        registry.register(instance());
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
    }
}
