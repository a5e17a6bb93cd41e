use crate::database::quiz::Quiz;

#[derive(Debug, Clone, Default)]
pub enum QuizState {
    #[default]
    Start,
    Selection,
    ReadyToRun {
        quiz: Quiz,
    },
    /// Questions are being delivered by the engine.
    Running,
}
