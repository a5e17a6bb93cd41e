use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use teloxide::{
    dispatching::dialogue::{GetChatId, InMemStorage},
    payloads::SendMessageSetters,
    prelude::{Dialogue, Requester},
    types::{CallbackQuery, ChatId, Message, ReplyMarkup},
    Bot,
};
use tracing::instrument;

use crate::{
    database::{connection::RetreiveQuiz, quiz::Quiz},
    engine::{
        resolver::AnswerOutcome,
        sequencer::SequenceCompletion,
        session::{QuestionResult, SessionState},
        QuizEngine,
    },
    keyboard::{action_keyboard, parse_answer_data, yes_no_keyboard},
    state::QuizState,
    HandlerResult, UserDialogue,
};

#[instrument(level = "info", skip(bot, dialogue, msg, connection), fields(chat_id = %msg.chat.id))]
pub(crate) async fn selection<Retreiver: RetreiveQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<Retreiver>,
) -> HandlerResult {
    let Some(quiz_name) = msg.text() else {
        bot.send_message(msg.chat.id, "Failed to retreive quiz: no input provided")
            .await?;
        return Ok(());
    };

    match connection.retreive_quiz(quiz_name).await {
        Ok(Some(quiz)) => {
            tracing::info!(quiz = quiz.title(), quiz_id = %quiz.uuid(), "quiz selected");
            bot.send_message(
                msg.chat.id,
                format!("{quiz}\nAre you ready to begin? (Yes/No)"),
            )
            .reply_markup(yes_no_keyboard())
            .await?;
            dialogue.update(QuizState::ReadyToRun { quiz }).await?;
        }
        Ok(None) => {
            tracing::info!(quiz_name, "quiz not found");
            bot.send_message(
                msg.chat.id,
                format!("Quiz with name '{}' not found.", quiz_name),
            )
            .await?;
        }
        Err(e) => {
            tracing::error!(error = %e, "database error");
            return Err(e);
        }
    }
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, msg, quiz, engine, storage), fields(chat_id = %msg.chat.id))]
pub(crate) async fn running_ready(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    quiz: Quiz,
    engine: QuizEngine,
    storage: Arc<InMemStorage<QuizState>>,
) -> HandlerResult {
    match msg.text() {
        Some("Yes") | Some("Yes✔️") => {
            if quiz.questions().is_empty() {
                bot.send_message(msg.chat.id, "Sorry, no questions for that quiz available.")
                    .reply_markup(action_keyboard())
                    .await?;
                dialogue.update(QuizState::Start).await?;
                return Ok(());
            }

            bot.send_message(msg.chat.id, "Let's begin!")
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
            dialogue.update(QuizState::Running).await?;

            let completion = Arc::new(ScoreReport::new(bot.clone(), storage));
            if let Err(e) = engine
                .start_sequence(
                    msg.chat.id,
                    SessionState::new(quiz.title()),
                    quiz.questions().to_vec(),
                    completion,
                )
                .await
            {
                tracing::warn!(error = %e, quiz = quiz.title(), "quiz could not start");
                dialogue.update(QuizState::Start).await?;
                bot.send_message(msg.chat.id, "What do you want to do now?")
                    .reply_markup(action_keyboard())
                    .await?;
            }
        }
        Some("No") | Some("No❌") => {
            tracing::info!(quiz = quiz.title(), "quiz declined");
            bot.send_message(msg.chat.id, "OK. Quitting quiz...").await?;
            dialogue.update(QuizState::Start).await?;
            bot.send_message(msg.chat.id, "What do you want to do now?")
                .reply_markup(action_keyboard())
                .await?;
        }
        _ => {
            bot.send_message(
                msg.chat.id,
                "Please, enter a valid answer <b>Yes</b> or <b>No</b>.",
            )
            .parse_mode(teloxide::types::ParseMode::Html)
            .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, q, engine), fields(from = ?q.from.id))]
pub(crate) async fn take_answer(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    engine: QuizEngine,
) -> HandlerResult {
    bot.answer_callback_query(&q.id).await?;

    let (Some(chat_id), Some((instance_id, option_index))) =
        (q.chat_id(), q.data.as_deref().and_then(parse_answer_data))
    else {
        tracing::debug!(data = ?q.data, "callback query is not an answer");
        return Ok(());
    };

    match engine.submit_answer(chat_id, instance_id, option_index).await {
        Ok(AnswerOutcome::Orphaned) => {
            dialogue.update(QuizState::Start).await?;
        }
        Ok(outcome) => tracing::debug!(?outcome, "answer handled"),
        Err(e) => {
            tracing::warn!(error = %e, "answer aborted the session");
            dialogue.update(QuizState::Start).await?;
        }
    }
    Ok(())
}

#[instrument(level = "info", skip(bot, msg), fields(chat_id = %msg.chat.id))]
pub(crate) async fn answer_with_buttons(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Please, answer with the buttons under the question. Enter /cancel to stop the test.",
    )
    .await?;
    Ok(())
}

/// Tells the user how the test went and returns the dialogue to the menu.
pub struct ScoreReport {
    bot: Bot,
    storage: Arc<InMemStorage<QuizState>>,
}

impl ScoreReport {
    pub fn new(bot: Bot, storage: Arc<InMemStorage<QuizState>>) -> Self {
        Self { bot, storage }
    }

    async fn report(&self, chat_id: ChatId, session: &SessionState) -> HandlerResult {
        self.bot
            .send_message(chat_id, "Congratulations! You completed the quiz!")
            .await?;
        self.bot
            .send_message(chat_id, summary(session))
            .await?;
        Dialogue::new(self.storage.clone(), chat_id)
            .update(QuizState::Start)
            .await?;
        self.bot
            .send_message(chat_id, "What do you want to do now?")
            .reply_markup(action_keyboard())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SequenceCompletion for ScoreReport {
    async fn on_sequence_complete(&self, chat_id: ChatId, session: &SessionState) {
        if let Err(e) = self.report(chat_id, session).await {
            tracing::error!(%chat_id, error = %e, "failed to report score");
        }
    }
}

fn summary(session: &SessionState) -> String {
    let mut topics: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for QuestionResult { topic, is_correct, .. } in &session.results {
        let entry = topics.entry(topic.as_str()).or_default();
        entry.1 += 1;
        if *is_correct {
            entry.0 += 1;
        }
    }

    let mut text = format!(
        "{}\nYour result is {}/{}",
        session.selection_key,
        session.score,
        session.questions.len()
    );
    for (topic, (correct, total)) in topics.iter().filter(|(topic, _)| !topic.is_empty()) {
        text.push_str(&format!("\n{topic}: {correct}/{total}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::quiz::{Answer, Question};
    use std::time::Duration;

    #[test]
    fn summary_groups_by_topic() {
        let mut session = SessionState::new("mixed");
        session.questions = (0..3)
            .map(|_| Question::new("?", Duration::from_secs(5), "x", vec![Answer::new("a", true)]))
            .collect();
        for (topic, is_correct) in [("algebra", true), ("geometry", false), ("algebra", true)] {
            session.record(QuestionResult {
                question_id: uuid::Uuid::new_v4(),
                selected_option: None,
                is_correct,
                time_spent: Duration::from_secs(1),
                topic: topic.into(),
            });
        }

        assert_eq!(
            summary(&session),
            "mixed\nYour result is 2/3\nalgebra: 2/2\ngeometry: 0/1"
        );
    }
}
