use std::sync::Arc;

use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        DpHandlerDescription, UpdateFilterExt, UpdateHandler,
    },
    dptree::{self, Handler},
    payloads::SendMessageSetters,
    prelude::{DependencyMap, Requester},
    types::{Message, Update},
    Bot,
};
use tracing::instrument;

use crate::{
    commands::{cancel, help, start, Command},
    database::connection::{Connection, RetreiveQuiz},
    keyboard::{action_keyboard, quizes_keyboard},
    runner,
    state::QuizState,
    HandlerResult, UserDialogue,
};

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel));

    let handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![QuizState::Start].endpoint(choose_what_to_do::<Connection>))
        .branch(running_scheme())
        .endpoint(invalid_state);

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(handler)
        .branch(Update::filter_callback_query().endpoint(runner::take_answer))
}

#[instrument(level = "info", skip(bot, msg, dialogue, connection), fields(chat_id = %msg.chat.id))]
async fn choose_what_to_do<QuizRetriever: RetreiveQuiz>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    connection: Arc<QuizRetriever>,
) -> HandlerResult {
    match msg.text() {
        Some("Take a quiz📝") => {
            let quizes = connection.retreive_all_quiz_names().await?;
            if quizes.is_empty() {
                bot.send_message(msg.chat.id, "No available quizes.")
                    .await?;
            } else {
                tracing::info!("choosing a quiz");
                bot.send_message(msg.chat.id, "Please, choose available quiz:")
                    .reply_markup(quizes_keyboard(&quizes))
                    .await?;
                dialogue.update(QuizState::Selection).await?;
            }
        }
        other => {
            tracing::info!(input = ?other, "invalid menu input");
            bot.send_message(msg.chat.id, "Invalid input. Please try again.")
                .reply_markup(action_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "debug")]
fn running_scheme() -> Handler<'static, DependencyMap, HandlerResult, DpHandlerDescription> {
    use dptree::case;
    tracing::debug!("Building dispatching tree for runner");
    Update::filter_message()
        .branch(case![QuizState::Selection].endpoint(runner::selection::<Connection>))
        .branch(case![QuizState::ReadyToRun { quiz }].endpoint(runner::running_ready))
        .branch(case![QuizState::Running].endpoint(runner::answer_with_buttons))
}

#[instrument(level = "info", skip(bot, msg), fields(chat_id = %msg.chat.id))]
async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    tracing::info!(input = ?msg.text(), "unhandled message");
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}
