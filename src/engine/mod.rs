//! Timed question delivery.
//!
//! The [`QuizEngine`] pushes the questions of a session one by one, gives each
//! of them a deadline and makes sure every emitted question is resolved
//! exactly once, either by the user's answer or by its timer.

pub mod cleanup;
pub mod completed;
pub mod error;
pub mod gateway;
mod locks;
pub mod registry;
pub mod resolver;
pub mod sequencer;
pub mod session;
pub mod timer;

use std::sync::Arc;

use teloxide::types::ChatId;
use tracing::instrument;

use crate::config::EngineConfig;
use crate::database::quiz::Question;

use cleanup::CleanupService;
use completed::CompletedInstances;
use error::{EngineError, EngineResult};
use gateway::MessagingGateway;
use locks::ChatLocks;
use registry::ActiveQuestions;
use sequencer::{SequenceCompletion, SequenceStep};
use session::{SessionState, SessionStore};
use timer::TimeoutScheduler;

#[derive(Clone)]
pub struct QuizEngine {
    registry: Arc<ActiveQuestions>,
    completed: Arc<CompletedInstances>,
    locks: Arc<ChatLocks>,
    timer: TimeoutScheduler,
    gateway: Arc<dyn MessagingGateway>,
    sessions: Arc<dyn SessionStore>,
    cleanup: CleanupService,
    config: EngineConfig,
}

impl QuizEngine {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        sessions: Arc<dyn SessionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry: Arc::new(ActiveQuestions::new()),
            completed: Arc::new(CompletedInstances::new(config.completed_capacity)),
            locks: Arc::new(ChatLocks::default()),
            timer: TimeoutScheduler::new(),
            cleanup: CleanupService::new(
                gateway.clone(),
                config.cleanup_batch_size,
                config.cleanup_batch_pause,
            ),
            gateway,
            sessions,
            config,
        }
    }

    pub fn registry(&self) -> &ActiveQuestions {
        &self.registry
    }

    /// Forgets every pending instance. Timers still sleeping from before
    /// become no-ops when they fire.
    pub fn reset_on_startup(&self) {
        self.registry.clear();
        self.completed.clear();
        tracing::info!("question registry cleared");
    }

    /// Starts a fresh question sequence for `chat_id`, replacing whatever
    /// sequence the chat had running.
    #[instrument(level = "info", skip(self, session, questions, completion), fields(questions = questions.len()))]
    pub async fn start_sequence(
        &self,
        chat_id: ChatId,
        mut session: SessionState,
        questions: Vec<Question>,
        completion: Arc<dyn SequenceCompletion>,
    ) -> EngineResult<SequenceStep> {
        let _guard = self.locks.lock(chat_id).await;
        self.retire(chat_id).await?;

        session.questions = questions;
        session.current_index = 0;
        session.score = 0;
        session.results.clear();
        session.current_instance = None;
        session.current_options.clear();

        self.advance_contained(chat_id, Some(session), completion)
            .await
    }

    /// Drops the chat's session without calling its completion.
    #[instrument(level = "info", skip(self))]
    pub async fn abandon(&self, chat_id: ChatId) -> EngineResult<()> {
        let _guard = self.locks.lock(chat_id).await;
        self.retire(chat_id).await
    }

    /// Unregisters the current instance, clears the session and deletes its
    /// messages. Caller holds the chat lock.
    async fn retire(&self, chat_id: ChatId) -> EngineResult<()> {
        let Some(session) = self.sessions.load(chat_id).await? else {
            return Ok(());
        };
        if let Some(instance_id) = session.current_instance {
            self.registry.remove(&instance_id);
            self.completed.insert(instance_id);
        }
        self.sessions.clear(chat_id).await?;

        let report = self
            .cleanup
            .cleanup(chat_id, &session.pending_message_ids)
            .await;
        tracing::info!(%chat_id, deleted = report.deleted, failed = report.failed, "session retired");
        Ok(())
    }

    async fn advance_contained(
        &self,
        chat_id: ChatId,
        session: Option<SessionState>,
        completion: Arc<dyn SequenceCompletion>,
    ) -> EngineResult<SequenceStep> {
        match self.advance(chat_id, session, completion).await {
            Ok(step) => Ok(step),
            Err(e) => {
                self.contain(chat_id, &e).await;
                Err(e)
            }
        }
    }

    /// Keeps a failure inside its session: tells the user and drops the
    /// session. Caller holds the chat lock.
    async fn contain(&self, chat_id: ChatId, error: &EngineError) {
        tracing::warn!(%chat_id, %error, "session aborted");

        if let Err(e) = self.retire(chat_id).await {
            tracing::error!(%chat_id, error = %e, "failed to drop aborted session");
        }
        if let Err(e) = self.gateway.send_message(chat_id, error.user_message()).await {
            tracing::warn!(%chat_id, error = %e, "failed to notify about aborted session");
        }
    }
}
