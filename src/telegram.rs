use async_trait::async_trait;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, InputFile, MessageId},
    Bot,
};
use url::Url;

use crate::engine::error::EngineResult;
use crate::engine::gateway::{MessagingGateway, OutboundPoll};
use crate::keyboard::answers_keyboard;

/// [`MessagingGateway`] backed by the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn image_file(image: &str) -> InputFile {
    match Url::parse(image) {
        Ok(url) => InputFile::url(url),
        Err(_) => InputFile::file_id(image.to_owned()),
    }
}

fn poll_text(poll: &OutboundPoll) -> String {
    format!(
        "Question #{}/{}\n{}\n\n⏱ {} s",
        poll.number,
        poll.total,
        poll.text,
        poll.time_limit.as_secs()
    )
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> EngineResult<MessageId> {
        let message = self.bot.send_message(chat_id, text).await?;
        Ok(message.id)
    }

    async fn send_photo(&self, chat_id: ChatId, image: &str) -> EngineResult<MessageId> {
        let message = self.bot.send_photo(chat_id, image_file(image)).await?;
        Ok(message.id)
    }

    async fn send_poll(&self, chat_id: ChatId, poll: &OutboundPoll) -> EngineResult<MessageId> {
        let message = self
            .bot
            .send_message(chat_id, poll_text(poll))
            .reply_markup(answers_keyboard(poll.instance_id, &poll.options))
            .await?;
        Ok(message.id)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> EngineResult<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registry::InstanceId;
    use std::time::Duration;

    #[test]
    fn poll_text_shows_position_and_limit() {
        let poll = OutboundPoll {
            instance_id: InstanceId::new(),
            number: 2,
            total: 3,
            text: "2+2?".into(),
            options: vec!["4".into()],
            time_limit: Duration::from_secs(15),
        };
        assert_eq!(poll_text(&poll), "Question #2/3\n2+2?\n\n⏱ 15 s");
    }
}
