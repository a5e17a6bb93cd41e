use std::time::Duration;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};

use super::error::EngineResult;
use super::registry::InstanceId;

/// A multiple-choice question ready to be rendered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPoll {
    pub instance_id: InstanceId,
    /// 1-based position of the question within its session.
    pub number: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<String>,
    pub time_limit: Duration,
}

/// Outbound side of the messaging platform. Every call may fail with
/// [`super::error::EngineError::Transport`].
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> EngineResult<MessageId>;

    async fn send_photo(&self, chat_id: ChatId, image: &str) -> EngineResult<MessageId>;

    async fn send_poll(&self, chat_id: ChatId, poll: &OutboundPoll) -> EngineResult<MessageId>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> EngineResult<()>;
}
