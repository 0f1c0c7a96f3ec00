//! Interactive selection of operations, grants and levels.
//!
//! Handlers never read the terminal directly; they go through a
//! [`SelectionPrompt`] so that batch mode and tests can substitute answers.

use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Selection cancelled")]
    Cancelled,

    #[error("Interactive selection needs a terminal")]
    NonInteractive,

    #[error("Invalid selection: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Source of user choices over a list of labelled options.
///
/// Returned indices refer to positions in `options`.
pub trait SelectionPrompt: Send + Sync {
    /// Pick any subset of `options`, returned in ascending order
    fn select_many(&self, message: &str, options: &[String]) -> Result<Vec<usize>, PromptError>;

    /// Pick exactly one of `options`
    fn select_one(&self, message: &str, options: &[String]) -> Result<usize, PromptError>;

    fn is_interactive(&self) -> bool;
}

// ============================================================================
// Terminal Prompt
// ============================================================================

/// Numbered menu on stderr, answers read from stdin.
#[derive(Debug, Default)]
pub struct TerminalSelectionPrompt;

impl TerminalSelectionPrompt {
    pub fn new() -> Self {
        Self
    }

    fn show(&self, out: &mut impl Write, message: &str, options: &[String]) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", message)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(out, "  [{}] {}", i + 1, option)?;
        }
        Ok(())
    }

    fn read_answer(&self, out: &mut impl Write, hint: &str) -> Result<String, PromptError> {
        write!(out, "{}: ", hint)?;
        out.flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(PromptError::Cancelled);
        }
        Ok(input.trim().to_string())
    }
}

impl SelectionPrompt for TerminalSelectionPrompt {
    fn select_many(&self, message: &str, options: &[String]) -> Result<Vec<usize>, PromptError> {
        if !atty_check() {
            return Err(PromptError::NonInteractive);
        }

        let mut out = io::stderr();
        self.show(&mut out, message, options)?;

        loop {
            let answer = self.read_answer(&mut out, "Select (e.g. 1,3-5 or all; empty to cancel)")?;
            match parse_selection(&answer, options.len()) {
                Err(PromptError::InvalidInput(reason)) => writeln!(out, "{}", reason)?,
                other => return other,
            }
        }
    }

    fn select_one(&self, message: &str, options: &[String]) -> Result<usize, PromptError> {
        if !atty_check() {
            return Err(PromptError::NonInteractive);
        }

        let mut out = io::stderr();
        self.show(&mut out, message, options)?;

        loop {
            let answer = self.read_answer(&mut out, "Choose one (empty to cancel)")?;
            match parse_single(&answer, options.len()) {
                Err(PromptError::InvalidInput(reason)) => writeln!(out, "{}", reason)?,
                other => return other,
            }
        }
    }

    fn is_interactive(&self) -> bool {
        atty_check()
    }
}

/// Parse a 1-based selection like `1,3-5`, `2 4` or `all`.
///
/// Empty input cancels. Duplicates are merged and the result is sorted.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, PromptError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PromptError::Cancelled);
    }
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return Ok((0..count).collect());
    }

    let mut picked = Vec::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let (start, end) = match token.split_once('-') {
            Some((start, end)) => (parse_index(start, count)?, parse_index(end, count)?),
            None => {
                let index = parse_index(token, count)?;
                (index, index)
            }
        };
        if start > end {
            return Err(PromptError::InvalidInput(format!(
                "range '{}' is reversed",
                token
            )));
        }
        picked.extend(start..=end);
    }

    picked.sort_unstable();
    picked.dedup();
    Ok(picked)
}

fn parse_single(input: &str, count: usize) -> Result<usize, PromptError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PromptError::Cancelled);
    }
    parse_index(input, count)
}

fn parse_index(token: &str, count: usize) -> Result<usize, PromptError> {
    match token.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(PromptError::InvalidInput(format!(
            "'{}' is not a number between 1 and {}",
            token.trim(),
            count
        ))),
    }
}

// ============================================================================
// Auto Prompt (batch mode)
// ============================================================================

/// Answers without asking: every option for `select_many`, the first one
/// for `select_one`.
#[derive(Debug, Default)]
pub struct AutoSelectionPrompt;

impl AutoSelectionPrompt {
    pub fn select_all() -> Self {
        Self
    }
}

impl SelectionPrompt for AutoSelectionPrompt {
    fn select_many(&self, _message: &str, options: &[String]) -> Result<Vec<usize>, PromptError> {
        Ok((0..options.len()).collect())
    }

    fn select_one(&self, _message: &str, options: &[String]) -> Result<usize, PromptError> {
        if options.is_empty() {
            Err(PromptError::InvalidInput("nothing to choose from".to_string()))
        } else {
            Ok(0)
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Recording Prompt (for testing)
// ============================================================================

/// A prompt that was shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    pub message: String,
    pub options: Vec<String>,
}

/// Returns scripted answers and records every prompt shown.
///
/// `select_many` answers are consumed in order; when they run out the
/// prompt reports [`PromptError::Cancelled`]. Same for `select_one`.
#[derive(Debug, Default)]
pub struct RecordingSelectionPrompt {
    prompts: Mutex<Vec<RecordedPrompt>>,
    many: Mutex<Vec<Vec<usize>>>,
    one: Mutex<Vec<usize>>,
}

impl RecordingSelectionPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next `select_many`
    pub fn answer_many(self, indices: impl Into<Vec<usize>>) -> Self {
        lock(&self.many).push(indices.into());
        self
    }

    /// Queue an answer for the next `select_one`
    pub fn answer_one(self, index: usize) -> Self {
        lock(&self.one).push(index);
        self
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        lock(&self.prompts).clone()
    }

    pub fn prompt_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    fn record(&self, message: &str, options: &[String]) {
        lock(&self.prompts).push(RecordedPrompt {
            message: message.to_string(),
            options: options.to_vec(),
        });
    }
}

impl SelectionPrompt for RecordingSelectionPrompt {
    fn select_many(&self, message: &str, options: &[String]) -> Result<Vec<usize>, PromptError> {
        self.record(message, options);
        let mut answers = lock(&self.many);
        if answers.is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(answers.remove(0))
    }

    fn select_one(&self, message: &str, options: &[String]) -> Result<usize, PromptError> {
        self.record(message, options);
        let mut answers = lock(&self.one);
        if answers.is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(answers.remove(0))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if stdin is connected to a terminal
fn atty_check() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: isatty is safe to call with any file descriptor
        unsafe { libc::isatty(io::stdin().as_raw_fd()) != 0 }
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::System::Console::{GetConsoleMode, CONSOLE_MODE};
        let handle = io::stdin().as_raw_handle();
        let mut mode: CONSOLE_MODE = 0;
        // SAFETY: GetConsoleMode is safe with valid handle
        unsafe { GetConsoleMode(handle as _, &mut mode) != 0 }
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::env::var("TERM").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("option {}", i)).collect()
    }

    #[test]
    fn test_parse_selection_lists_and_ranges() {
        assert_eq!(parse_selection("1,3-5", 5).unwrap(), vec![0, 2, 3, 4]);
        assert_eq!(parse_selection(" 2 1 2 ", 3).unwrap(), vec![0, 1]);
        assert_eq!(parse_selection("all", 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_selection("*", 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_parse_selection_rejects_bad_input() {
        assert!(matches!(parse_selection("", 3), Err(PromptError::Cancelled)));
        assert!(matches!(
            parse_selection("0", 3),
            Err(PromptError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_selection("4", 3),
            Err(PromptError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_selection("3-1", 3),
            Err(PromptError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_selection("x", 3),
            Err(PromptError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_single() {
        assert_eq!(parse_single("2", 3).unwrap(), 1);
        assert!(matches!(parse_single("", 3), Err(PromptError::Cancelled)));
        assert!(matches!(
            parse_single("1,2", 3),
            Err(PromptError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_auto_prompt() {
        let prompt = AutoSelectionPrompt::select_all();
        assert_eq!(prompt.select_many("pick", &options(3)).unwrap(), vec![0, 1, 2]);
        assert_eq!(prompt.select_one("pick", &options(3)).unwrap(), 0);
        assert!(!prompt.is_interactive());

        assert!(matches!(
            prompt.select_one("pick", &[]),
            Err(PromptError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_recording_prompt_replays_answers() {
        let prompt = RecordingSelectionPrompt::new()
            .answer_many(vec![1])
            .answer_one(2);

        assert_eq!(prompt.select_many("first", &options(2)).unwrap(), vec![1]);
        assert_eq!(prompt.select_one("second", &options(3)).unwrap(), 2);
        assert!(matches!(
            prompt.select_many("third", &options(1)),
            Err(PromptError::Cancelled)
        ));

        assert!(prompt.is_interactive());
        let prompts = prompt.prompts();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].message, "first");
        assert_eq!(prompts[1].options, options(3));
    }
}
