use teloxide::types::ChatId;
use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

/// Every failure the engine can hit. None of them is fatal to the process:
/// they are contained at the session boundary by [`crate::engine::QuizEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session of chat {chat_id} is no longer tracked")]
    OrphanedSession { chat_id: ChatId },
    #[error("question {question_id} is unusable: {reason}")]
    Content { question_id: Uuid, reason: String },
    #[error("messaging gateway failed: {0}")]
    Transport(String),
    #[error("session of chat {chat_id} lost data: {reason}")]
    DataLoss { chat_id: ChatId, reason: String },
    #[error("storage failed: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::OrphanedSession { .. } | EngineError::DataLoss { .. } => {
                "The test was interrupted. Please start it again with /start."
            }
            EngineError::Content { .. } | EngineError::Storage(_) => {
                "Sorry, something went wrong with this test. Please try another one."
            }
            EngineError::Transport(_) => {
                "Sorry, the next question could not be delivered. The test was stopped."
            }
        }
    }
}

impl From<teloxide::RequestError> for EngineError {
    fn from(e: teloxide::RequestError) -> Self {
        EngineError::Transport(e.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_classes_share_a_message() {
        let orphan = EngineError::OrphanedSession { chat_id: ChatId(1) };
        let lost = EngineError::DataLoss {
            chat_id: ChatId(1),
            reason: "no questions".into(),
        };
        assert_eq!(orphan.user_message(), lost.user_message());
        assert_ne!(
            orphan.user_message(),
            EngineError::Transport("timeout".into()).user_message()
        );
    }
}
