use std::error::Error;
use std::sync::Arc;

use quizengine::config::{BotConfig, EngineConfig};
use quizengine::database::connection::Connection;
use quizengine::engine::session::InMemSessionStore;
use quizengine::engine::QuizEngine;
use quizengine::schema::schema;
use quizengine::state::QuizState;
use quizengine::telegram::TelegramGateway;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

type MainResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

fn init_tracing(level: tracing::Level) -> MainResult {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_level(level))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> MainResult {
    let config = BotConfig::from_env()?;
    init_tracing(config.log_level)?;

    let connection = Arc::new(Connection::connect(&config.database_url).await?);
    connection.run_migrations().await?;

    let bot = Bot::new(&config.token);
    tracing::info!("Starting bot...");

    let engine = QuizEngine::new(
        Arc::new(TelegramGateway::new(bot.clone())),
        Arc::new(InMemSessionStore::new()),
        EngineConfig::from_env(),
    );
    engine.reset_on_startup();

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![
            InMemStorage::<QuizState>::new(),
            connection,
            engine
        ])
        .enable_ctrlc_handler()
        .build();

    if let Some((ngrok_url, ngrok_addr)) = config.webhook {
        let listener = webhooks::axum(bot, Options::new(ngrok_addr, ngrok_url)).await?;
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        dispatcher.dispatch().await
    }

    Ok(())
}
