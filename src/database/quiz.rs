use std::{fmt, time::Duration};

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Quiz {
    uuid: Uuid,
    title: String,
    description: String,
    author: String,
    questions: Vec<Question>,
}

/// Immutable question content as handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    uuid: Uuid,
    text: String,
    image: Option<String>,
    time_limit: Duration,
    topic: String,
    answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    uuid: Uuid,
    text: String,
    is_correct: bool,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\nBy {}.\nQuestions: {}",
            self.title(),
            self.description(),
            self.author(),
            self.questions().len()
        )
    }
}

impl Quiz {
    pub fn retreive(uuid: Uuid, title: String, description: String, author: String) -> Self {
        Self {
            uuid,
            title,
            description,
            author,
            questions: vec![],
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        time_limit: Duration,
        topic: impl Into<String>,
        answers: Vec<Answer>,
    ) -> Self {
        Self::retreive(Uuid::new_v4(), text.into(), None, time_limit, topic.into())
            .with_answers(answers)
    }

    pub fn retreive(
        uuid: Uuid,
        text: String,
        image: Option<String>,
        time_limit: Duration,
        topic: String,
    ) -> Self {
        Self {
            uuid,
            text,
            image,
            time_limit: time_limit.max(Duration::from_secs(1)),
            topic,
            answers: vec![],
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    fn with_answers(mut self, answers: Vec<Answer>) -> Self {
        self.answers = answers;
        self
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn add_answer(&mut self, answer: Answer) {
        self.answers.push(answer);
    }

    /// Index of the first correct option.
    pub fn correct_option(&self) -> Option<usize> {
        self.answers.iter().position(Answer::is_correct)
    }
}

impl Answer {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Answer {
        Self::retreive(Uuid::new_v4(), text.into(), is_correct)
    }

    pub fn retreive(uuid: Uuid, text: String, is_correct: bool) -> Answer {
        Self {
            uuid,
            text,
            is_correct,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }
}
