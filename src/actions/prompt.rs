//! Interactive "keep which file?" prompt.
//!
//! The prompt is an explicit state machine:
//!
//! ```text
//! AwaitingInput --valid number--> Valid
//! AwaitingInput --anything else--> Invalid --retry--> AwaitingInput
//!                                          \--no retries left--> Exhausted
//! ```
//!
//! The retry cap keeps a non-interactive run from looping forever on bad
//! input.

use std::fmt;
use std::io::{self, BufRead, Write};

/// Why an answer was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidChoice {
    /// The answer was not a number.
    NotANumber(String),
    /// The number is not one of the listed choices.
    OutOfRange(i64),
}

impl fmt::Display for InvalidChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(_) => write!(f, "Please enter a number"),
            Self::OutOfRange(n) => write!(f, "{n} is not a valid choice"),
        }
    }
}

/// State of one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    /// Waiting for an answer; `attempt` counts from 1.
    AwaitingInput {
        /// Current attempt number
        attempt: u32,
    },
    /// A valid 0-based choice was made.
    Valid(usize),
    /// The last answer was rejected.
    Invalid {
        /// Attempt that was rejected
        attempt: u32,
        /// Why it was rejected
        reason: InvalidChoice,
    },
    /// Every allowed attempt was rejected.
    Exhausted,
}

impl PromptState {
    /// Initial state.
    #[must_use]
    pub fn start() -> Self {
        Self::AwaitingInput { attempt: 1 }
    }

    /// Feed an answer for a list of `choices` items (1-based on screen).
    ///
    /// Only meaningful in [`PromptState::AwaitingInput`]; other states are
    /// returned unchanged.
    #[must_use]
    pub fn accept(self, answer: &str, choices: usize) -> Self {
        let Self::AwaitingInput { attempt } = self else {
            return self;
        };
        let answer = answer.trim();
        let reason = match answer.parse::<i64>() {
            Ok(n) if n >= 1 && (n as u64) <= choices as u64 => return Self::Valid(n as usize - 1),
            Ok(n) => InvalidChoice::OutOfRange(n),
            Err(_) => InvalidChoice::NotANumber(answer.to_string()),
        };
        Self::Invalid { attempt, reason }
    }

    /// Leave [`PromptState::Invalid`]: ask again or give up after
    /// `max_attempts` rejected answers.
    #[must_use]
    pub fn retry(self, max_attempts: u32) -> Self {
        match self {
            Self::Invalid { attempt, .. } if attempt >= max_attempts => Self::Exhausted,
            Self::Invalid { attempt, .. } => Self::AwaitingInput {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}

/// Result of asking which file to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Keep the file at this 0-based index.
    Keep(usize),
    /// No valid answer within the retry limit.
    Exhausted,
    /// Input closed before a valid answer.
    EndOfInput,
}

/// Ask which of `files` to keep.
///
/// The listing and messages go to `output`; answers are read line by line
/// from `input`.
///
/// # Errors
///
/// Returns I/O errors from reading or writing.
pub fn ask_keep<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    checksum: &str,
    files: &[String],
    max_attempts: u32,
) -> io::Result<PromptOutcome> {
    let mut state = PromptState::start();
    let mut line = String::new();

    loop {
        match state {
            PromptState::AwaitingInput { .. } => {
                for (i, file) in files.iter().enumerate() {
                    writeln!(output, "# [{}] {}", i + 1, file)?;
                }
                write!(output, "# All of these have checksum {checksum}. Keep which? ")?;
                output.flush()?;

                line.clear();
                if input.read_line(&mut line)? == 0 {
                    writeln!(output)?;
                    return Ok(PromptOutcome::EndOfInput);
                }
                state = state.accept(&line, files.len());
            }
            PromptState::Invalid { ref reason, .. } => {
                writeln!(output, "# {reason}\n")?;
                state = state.retry(max_attempts);
            }
            PromptState::Valid(index) => return Ok(PromptOutcome::Keep(index)),
            PromptState::Exhausted => {
                writeln!(output, "# Too many invalid answers, skipping")?;
                return Ok(PromptOutcome::Exhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn files() -> Vec<String> {
        vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()]
    }

    #[test]
    fn test_accept_valid() {
        assert_eq!(PromptState::start().accept("2\n", 3), PromptState::Valid(1));
        assert_eq!(PromptState::start().accept(" 3 ", 3), PromptState::Valid(2));
    }

    #[test]
    fn test_accept_invalid() {
        assert_eq!(
            PromptState::start().accept("0", 3),
            PromptState::Invalid {
                attempt: 1,
                reason: InvalidChoice::OutOfRange(0)
            }
        );
        assert_eq!(
            PromptState::start().accept("four", 3),
            PromptState::Invalid {
                attempt: 1,
                reason: InvalidChoice::NotANumber("four".to_string())
            }
        );
        assert!(matches!(
            PromptState::start().accept("-1", 3),
            PromptState::Invalid {
                reason: InvalidChoice::OutOfRange(-1),
                ..
            }
        ));
    }

    #[test]
    fn test_retry_transitions() {
        let invalid = PromptState::start().accept("x", 2);
        assert_eq!(
            invalid.clone().retry(3),
            PromptState::AwaitingInput { attempt: 2 }
        );
        assert_eq!(invalid.retry(1), PromptState::Exhausted);
        assert_eq!(PromptState::Valid(0).retry(3), PromptState::Valid(0));
    }

    #[test]
    fn test_ask_keep_first_answer() {
        let mut input = Cursor::new("2\n");
        let mut output = Vec::new();
        let outcome = ask_keep(&mut input, &mut output, "abc", &files(), 3).unwrap();

        assert_eq!(outcome, PromptOutcome::Keep(1));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("# [1] a.txt"));
        assert!(text.contains("# [3] c.txt"));
        assert!(text.contains("All of these have checksum abc. Keep which?"));
    }

    #[test]
    fn test_ask_keep_retries_then_accepts() {
        let mut input = Cursor::new("nope\n9\n1\n");
        let mut output = Vec::new();
        let outcome = ask_keep(&mut input, &mut output, "abc", &files(), 3).unwrap();

        assert_eq!(outcome, PromptOutcome::Keep(0));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("# Please enter a number"));
        assert!(text.contains("# 9 is not a valid choice"));
    }

    #[test]
    fn test_ask_keep_exhausted() {
        let mut input = Cursor::new("x\ny\nz\n1\n");
        let mut output = Vec::new();
        let outcome = ask_keep(&mut input, &mut output, "abc", &files(), 3).unwrap();
        assert_eq!(outcome, PromptOutcome::Exhausted);
    }

    #[test]
    fn test_ask_keep_end_of_input() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let outcome = ask_keep(&mut input, &mut output, "abc", &files(), 3).unwrap();
        assert_eq!(outcome, PromptOutcome::EndOfInput);
    }
}
