use async_trait::async_trait;
use teloxide::types::ChatId;
use tracing::instrument;

use super::error::{EngineError, EngineResult};
use super::registry::{InstanceId, QuestionInstance};
use super::sequencer::SequenceStep;
use super::session::QuestionResult;
use super::timer::TimeoutHandler;
use super::QuizEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The answer resolved the question.
    Accepted { is_correct: bool, next: SequenceStep },
    /// The question was already resolved; nothing changed.
    Duplicate,
    /// Nothing is tracked for the answer; the user was told the test was
    /// interrupted and the session dropped.
    Orphaned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    Expired,
    AlreadyResolved,
}

impl QuizEngine {
    /// Handles a user's answer. `instance_id` is `None` when the signal
    /// carried no usable id. An absent or stale id falls back to the
    /// session's current question.
    #[instrument(level = "info", skip(self))]
    pub async fn submit_answer(
        &self,
        chat_id: ChatId,
        instance_id: Option<InstanceId>,
        option_index: usize,
    ) -> EngineResult<AnswerOutcome> {
        let _guard = self.locks.lock(chat_id).await;

        if let Some(id) = instance_id {
            if self.completed.contains(&id) {
                tracing::debug!(%chat_id, instance_id = %id, "late answer ignored");
                return Ok(AnswerOutcome::Duplicate);
            }
        }

        let session = self.sessions.load(chat_id).await?;
        let current = session.as_ref().and_then(|s| s.current_instance);
        let registered = instance_id.and_then(|id| self.registry.get(&id));

        let instance = match (registered, current) {
            (Some(instance), _) => Some(instance),
            (None, Some(current)) => {
                if let Some(id) = instance_id {
                    tracing::debug!(%chat_id, instance_id = %id, %current, "stale answer, using current question");
                }
                self.registry.get(&current)
            }
            (None, None) if session.is_some() => {
                tracing::debug!(%chat_id, "no question pending, answer ignored");
                return Ok(AnswerOutcome::Duplicate);
            }
            (None, None) => None,
        };
        let Some(instance) = instance else {
            self.contain(chat_id, &EngineError::OrphanedSession { chat_id })
                .await;
            return Ok(AnswerOutcome::Orphaned);
        };

        if instance.chat_id != chat_id {
            tracing::warn!(%chat_id, owner = %instance.chat_id, "answer for another chat's question");
            return Ok(AnswerOutcome::Duplicate);
        }
        if !self.registry.mark_answered(&instance.instance_id) {
            tracing::debug!(%chat_id, instance_id = %instance.instance_id, "duplicate answer ignored");
            return Ok(AnswerOutcome::Duplicate);
        }
        self.completed.insert(instance.instance_id);

        let outcome = self.record_answer(chat_id, &instance, option_index).await;
        self.registry.remove(&instance.instance_id);

        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.contain(chat_id, &e).await;
                Err(e)
            }
        }
    }

    async fn record_answer(
        &self,
        chat_id: ChatId,
        instance: &QuestionInstance,
        option_index: usize,
    ) -> EngineResult<AnswerOutcome> {
        let Some(mut session) = self.sessions.load(chat_id).await? else {
            return Err(EngineError::DataLoss {
                chat_id,
                reason: "session vanished while a question was pending".into(),
            });
        };

        let selected = session.current_options.get(option_index);
        let is_correct = selected.is_some_and(|answer| answer.is_correct());
        let topic = session
            .current_question()
            .map(|q| q.topic().to_owned())
            .unwrap_or_default();

        tracing::info!(
            %chat_id,
            instance_id = %instance.instance_id,
            option_index,
            is_correct,
            "answer recorded"
        );
        session.record(QuestionResult {
            question_id: instance.question_id,
            selected_option: selected.map(|answer| *answer.uuid()),
            is_correct,
            time_spent: instance.start_time.elapsed(),
            topic,
        });

        let next = self
            .advance(chat_id, Some(session), instance.completion.clone())
            .await?;
        Ok(AnswerOutcome::Accepted { is_correct, next })
    }

    /// Resolves `instance_id` as unanswered if nobody resolved it first.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_timeout(&self, instance_id: InstanceId) -> TimeoutOutcome {
        let Some(instance) = self.registry.get(&instance_id) else {
            tracing::debug!(%instance_id, "timer fired for a resolved question");
            return TimeoutOutcome::AlreadyResolved;
        };
        let chat_id = instance.chat_id;

        {
            let _guard = self.locks.lock(chat_id).await;
            if !self.registry.mark_answered(&instance_id) {
                return TimeoutOutcome::AlreadyResolved;
            }
            self.completed.insert(instance_id);

            let recorded = self.record_timeout(chat_id, &instance).await;
            self.registry.remove(&instance_id);
            if let Err(e) = recorded {
                self.contain(chat_id, &e).await;
                return TimeoutOutcome::Expired;
            }
        }

        tokio::time::sleep(self.config.timeout_grace).await;

        let _guard = self.locks.lock(chat_id).await;
        let session = match self.sessions.load(chat_id).await {
            Ok(Some(session)) if session.current_instance.is_none() => session,
            Ok(_) => {
                tracing::debug!(%chat_id, "session moved on during grace period");
                return TimeoutOutcome::Expired;
            }
            Err(e) => {
                self.contain(chat_id, &e).await;
                return TimeoutOutcome::Expired;
            }
        };
        if let Err(e) = self
            .advance_contained(chat_id, Some(session), instance.completion.clone())
            .await
        {
            tracing::warn!(%chat_id, error = %e, "could not continue after timeout");
        }
        TimeoutOutcome::Expired
    }

    async fn record_timeout(&self, chat_id: ChatId, instance: &QuestionInstance) -> EngineResult<()> {
        let session = self.sessions.load(chat_id).await?;
        let Some(mut session) = session.filter(|s| s.current_instance == Some(instance.instance_id))
        else {
            return Err(EngineError::DataLoss {
                chat_id,
                reason: "timed out question is not the session's current one".into(),
            });
        };

        let correct = session
            .current_options
            .iter()
            .find(|answer| answer.is_correct())
            .map(|answer| answer.text().to_owned())
            .unwrap_or_default();
        let topic = session
            .current_question()
            .map(|q| q.topic().to_owned())
            .unwrap_or_default();

        tracing::info!(%chat_id, instance_id = %instance.instance_id, "question timed out");
        session.record(QuestionResult {
            question_id: instance.question_id,
            selected_option: None,
            is_correct: false,
            time_spent: instance.time_limit,
            topic,
        });

        match self
            .gateway
            .send_message(chat_id, &format!("⏰ Time is up! The correct answer was: {correct}"))
            .await
        {
            Ok(message_id) => session.track_message(message_id),
            Err(e) => tracing::warn!(%chat_id, error = %e, "failed to send timeout notice"),
        }

        self.sessions.save(chat_id, &session).await
    }
}

#[async_trait]
impl TimeoutHandler for QuizEngine {
    async fn on_timeout(&self, instance_id: InstanceId) {
        self.resolve_timeout(instance_id).await;
    }
}
