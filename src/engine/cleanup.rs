use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use teloxide::types::{ChatId, MessageId};
use tracing::instrument;

use super::gateway::MessagingGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

impl CleanupReport {
    fn tally(&mut self, outcome: DeleteOutcome) {
        match outcome {
            DeleteOutcome::Deleted => self.deleted += 1,
            DeleteOutcome::Failed => self.failed += 1,
        }
    }
}

/// Best-effort removal of the transient messages of a finished session.
#[derive(Clone)]
pub struct CleanupService {
    gateway: Arc<dyn MessagingGateway>,
    batch_size: usize,
    batch_pause: Duration,
}

impl CleanupService {
    pub fn new(gateway: Arc<dyn MessagingGateway>, batch_size: usize, batch_pause: Duration) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
            batch_pause,
        }
    }

    /// Deletes `message_ids` in concurrent batches, pausing between batches.
    /// Never fails; failures are only counted.
    #[instrument(level = "debug", skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn cleanup(&self, chat_id: ChatId, message_ids: &[MessageId]) -> CleanupReport {
        let mut report = CleanupReport::default();

        for (i, batch) in message_ids.chunks(self.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }
            let outcomes = join_all(batch.iter().map(|id| self.delete_one(chat_id, *id))).await;
            outcomes.into_iter().for_each(|outcome| report.tally(outcome));
        }

        tracing::debug!(
            deleted = report.deleted,
            failed = report.failed,
            "cleanup finished"
        );
        report
    }

    async fn delete_one(&self, chat_id: ChatId, message_id: MessageId) -> DeleteOutcome {
        match self.gateway.delete_message(chat_id, message_id).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) => {
                tracing::trace!(message_id = message_id.0, error = %e, "delete skipped");
                DeleteOutcome::Failed
            }
        }
    }
}
