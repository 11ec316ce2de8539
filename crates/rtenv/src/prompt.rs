use std::io::{self, BufRead, Write};

use rtenv_backend::Prompt;

/// Asks on stderr and reads the answer from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "rtenv: {question} ").and_then(|()| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(error) => {
                log::warn!("Failed to read answer: {error}");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().chars().next(), Some('y' | 'Y'))
}
