use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::engine::registry::InstanceId;

pub(crate) fn yes_no_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = vec![vec![
        KeyboardButton::new("Yes✔️"),
        KeyboardButton::new("No❌"),
    ]];

    KeyboardMarkup::new(keyboard)
}

/// One button per option; the callback data names the question instance and
/// the option index so the answer can be matched to its question.
pub(crate) fn answers_keyboard(instance_id: InstanceId, options: &[String]) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            vec![InlineKeyboardButton::callback(
                text.clone(),
                format!("{instance_id}:{idx}"),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

/// Reads `"<instance_id>:<index>"`. An unreadable instance id yields `None`
/// for the id so the session's current question can be used instead.
pub(crate) fn parse_answer_data(data: &str) -> Option<(Option<InstanceId>, usize)> {
    let (instance, index) = data.rsplit_once(':')?;
    let index = index.parse().ok()?;
    Some((instance.parse().ok(), index))
}

pub(crate) fn quizes_keyboard(quizes: &[String]) -> KeyboardMarkup {
    let keyboard = quizes
        .iter()
        .map(|quiz| vec![KeyboardButton::new(quiz)]);

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn action_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new("Take a quiz📝")]])
}
