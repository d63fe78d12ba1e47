//! Interactive yes/no confirmation.

use std::io::{BufRead, Write};

use colored::Colorize;

use crate::domain::{AppError, Result};

const AFFIRMATIVE: &[&str] = &["j", "ja", "y", "yes", "do it", "let's rock"];
const NEGATIVE: &[&str] = &["n", "nein", "no", "hell no"];

/// Re-prompts allowed before giving up.
const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Interpret a free-form answer.
///
/// # Errors
/// Returns `UnparsableAnswer` if the text is neither affirmative nor negative.
pub fn parse_answer(input: &str) -> Result<bool> {
    let answer = input.trim().to_lowercase();

    if AFFIRMATIVE.contains(&answer.as_str()) {
        Ok(true)
    } else if NEGATIVE.contains(&answer.as_str()) {
        Ok(false)
    } else {
        Err(AppError::UnparsableAnswer { answer })
    }
}

/// Answer obtained from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub confirmed: bool,
    /// Number of questions asked, including the one that was answered.
    pub attempts: usize,
}

/// A yes/no question that is repeated until it gets a usable answer.
#[derive(Debug, Clone)]
pub struct Confirm {
    question: String,
    max_attempts: usize,
}

impl Confirm {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Ask on the terminal.
    ///
    /// # Errors
    /// See [`Confirm::ask_with`].
    pub fn ask(&self) -> Result<Confirmation> {
        let stdin = std::io::stdin();
        self.ask_with(&mut stdin.lock(), &mut std::io::stderr())
    }

    /// Ask using the given input and output.
    ///
    /// Reads block. Inside a multi-threaded tokio runtime the worker is handed
    /// off with `block_in_place` first.
    ///
    /// # Errors
    /// Returns `Io` on end of input or a read failure, and the last
    /// `UnparsableAnswer` once `max_attempts` questions went unanswered.
    pub fn ask_with<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<Confirmation> {
        tokio::task::block_in_place(|| self.prompt_loop(input, output))
    }

    fn prompt_loop<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<Confirmation> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            write!(output, "{} [y/n] ", self.question.yellow())
                .and_then(|()| output.flush())
                .map_err(|e| AppError::io("Failed to write prompt", e))?;

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| AppError::io("Failed to read answer", e))?;
            if read == 0 {
                return Err(AppError::io(
                    "No answer given",
                    std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
                ));
            }

            match parse_answer(&line) {
                Ok(confirmed) => return Ok(Confirmation { confirmed, attempts }),
                Err(e) if attempts >= self.max_attempts => return Err(e),
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }
}
