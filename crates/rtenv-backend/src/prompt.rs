use std::collections::VecDeque;

/// Source of answers to yes/no questions.
pub trait Prompt {
    /// Ask `question` and return whether the user agreed.
    fn confirm(&mut self, question: &str) -> bool;
}

/// A prompt that replays pre-recorded answers and remembers what it was
/// asked. Once the answers run out every further question is declined.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}
