use std::{error::Error, time::Duration};

use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::quiz::{Answer, Question, Quiz};

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(connection_string).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

type RetreiveResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Question content provider: a quiz name selects an ordered question list.
#[allow(async_fn_in_trait)]
pub trait RetreiveQuiz {
    async fn retreive_quiz(&self, id: impl Into<String>) -> RetreiveResult<Option<Quiz>>;

    async fn retreive_all_quiz_names(&self) -> RetreiveResult<Vec<String>>;
}

#[derive(sqlx::FromRow)]
struct QuizRecord {
    uuid: Uuid,
    name: String,
    description: String,
    author: String,
}

#[derive(sqlx::FromRow)]
struct QuestionRecord {
    uuid: Uuid,
    text: String,
    image: Option<String>,
    time_limit: i32,
    topic: String,
}

#[derive(sqlx::FromRow)]
struct AnswerRecord {
    uuid: Uuid,
    text: String,
    is_correct: bool,
}

impl RetreiveQuiz for Connection {
    async fn retreive_quiz(&self, id: impl Into<String>) -> RetreiveResult<Option<Quiz>> {
        let mut tx = self.pool.begin().await?;

        let quiz_record = sqlx::query_as::<_, QuizRecord>(
            "SELECT uuid, name, description, author FROM quizes WHERE name = $1",
        )
        .bind(id.into())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(quiz_record) = quiz_record else {
            return Ok(None);
        };

        let mut quiz = Quiz::retreive(
            quiz_record.uuid,
            quiz_record.name,
            quiz_record.description,
            quiz_record.author,
        );

        let question_records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT uuid, text, image, time_limit, topic FROM questions WHERE quiz_id = $1 ORDER BY position",
        )
        .bind(quiz_record.uuid)
        .fetch_all(&mut *tx)
        .await?;

        for question_record in question_records {
            let mut question = Question::retreive(
                question_record.uuid,
                question_record.text,
                question_record.image,
                Duration::from_secs(question_record.time_limit.max(1) as u64),
                question_record.topic,
            );

            let answer_records = sqlx::query_as::<_, AnswerRecord>(
                "SELECT uuid, text, is_correct FROM answers WHERE question_id = $1 ORDER BY position",
            )
            .bind(question_record.uuid)
            .fetch_all(&mut *tx)
            .await?;

            answer_records.into_iter().for_each(|answer| {
                question.add_answer(Answer::retreive(answer.uuid, answer.text, answer.is_correct))
            });

            quiz.add_question(question);
        }

        tx.commit().await?;

        tracing::debug!(quiz = quiz.title(), questions = quiz.questions().len(), "quiz retreived");
        Ok(Some(quiz))
    }

    async fn retreive_all_quiz_names(&self) -> RetreiveResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM quizes ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(names)
    }
}
