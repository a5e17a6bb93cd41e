use std::sync::Arc;

use async_trait::async_trait;
use teloxide::types::ChatId;
use tokio::time::Instant;
use tracing::instrument;

use crate::database::quiz::Question;

use super::error::{EngineError, EngineResult};
use super::gateway::OutboundPoll;
use super::registry::{InstanceId, QuestionInstance};
use super::session::SessionState;
use super::QuizEngine;

/// What to do once every question of a session has been resolved.
/// Implemented per kind of test; never called for abandoned sessions.
#[async_trait]
pub trait SequenceCompletion: Send + Sync {
    async fn on_sequence_complete(&self, chat_id: ChatId, session: &SessionState);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStep {
    Emitted(InstanceId),
    Completed,
}

fn validate(question: &Question) -> EngineResult<()> {
    if question.answers().is_empty() {
        return Err(EngineError::Content {
            question_id: *question.uuid(),
            reason: "no answer options".into(),
        });
    }
    match question.correct_option() {
        Some(_) => Ok(()),
        None => Err(EngineError::Content {
            question_id: *question.uuid(),
            reason: "no correct option".into(),
        }),
    }
}

impl QuizEngine {
    /// Emits the session's current question or, when none is left, finishes
    /// the session. Caller holds the chat lock.
    #[instrument(level = "debug", skip(self, session, completion))]
    pub(crate) async fn advance(
        &self,
        chat_id: ChatId,
        session: Option<SessionState>,
        completion: Arc<dyn SequenceCompletion>,
    ) -> EngineResult<SequenceStep> {
        let Some(mut session) = session.filter(|s| !s.questions.is_empty()) else {
            return Err(EngineError::DataLoss {
                chat_id,
                reason: "session has no questions".into(),
            });
        };

        if session.is_exhausted() {
            self.finish(chat_id, session, completion).await?;
            return Ok(SequenceStep::Completed);
        }

        let instance_id = InstanceId::new();
        let emitted = self
            .emit(chat_id, &mut session, instance_id, completion)
            .await;

        if let Err(e) = emitted {
            self.registry.remove(&instance_id);
            // keep whatever was already sent so it gets cleaned up
            if let Err(save_error) = self.sessions.save(chat_id, &session).await {
                tracing::warn!(%chat_id, error = %save_error, "failed to save partial session");
            }
            return Err(e);
        }

        let time_limit = session
            .current_question()
            .map(Question::time_limit)
            .unwrap_or_default();
        self.timer
            .schedule_timeout(instance_id, time_limit, Arc::new(self.clone()));

        Ok(SequenceStep::Emitted(instance_id))
    }

    async fn emit(
        &self,
        chat_id: ChatId,
        session: &mut SessionState,
        instance_id: InstanceId,
        completion: Arc<dyn SequenceCompletion>,
    ) -> EngineResult<()> {
        let question = session
            .current_question()
            .cloned()
            .ok_or_else(|| EngineError::DataLoss {
                chat_id,
                reason: "current question is missing".into(),
            })?;
        validate(&question)?;

        tracing::info!(
            %chat_id,
            %instance_id,
            number = session.current_index + 1,
            question = question.text(),
            "asking question"
        );

        self.registry.register(QuestionInstance {
            instance_id,
            chat_id,
            question_id: *question.uuid(),
            answered: false,
            start_time: Instant::now(),
            time_limit: question.time_limit(),
            completion,
        });
        session.current_instance = Some(instance_id);
        session.current_options = question.answers().to_vec();

        if let Some(image) = question.image() {
            let message_id = self.gateway.send_photo(chat_id, image).await?;
            session.track_message(message_id);
        }

        let poll = OutboundPoll {
            instance_id,
            number: session.current_index + 1,
            total: session.questions.len(),
            text: question.text().to_owned(),
            options: question
                .answers()
                .iter()
                .map(|answer| answer.text().to_owned())
                .collect(),
            time_limit: question.time_limit(),
        };
        let message_id = self.gateway.send_poll(chat_id, &poll).await?;
        session.track_message(message_id);

        self.sessions.save(chat_id, session).await
    }

    async fn finish(
        &self,
        chat_id: ChatId,
        session: SessionState,
        completion: Arc<dyn SequenceCompletion>,
    ) -> EngineResult<()> {
        self.sessions.clear(chat_id).await?;

        tracing::info!(
            %chat_id,
            score = session.score,
            questions = session.questions.len(),
            "sequence completed"
        );
        completion.on_sequence_complete(chat_id, &session).await;

        self.cleanup
            .cleanup(chat_id, &session.pending_message_ids)
            .await;
        Ok(())
    }
}
