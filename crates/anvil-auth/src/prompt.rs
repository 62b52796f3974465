//! Interactive terminal prompts.
//!
//! Login flows take a [`Prompter`] rather than reading stdin directly so
//! the protocol state machines can be driven by a scripted prompter in
//! tests.

use std::io::{self, BufRead, Write};

use crate::error::{AuthError, AuthResult};

/// Source of interactive user input.
pub trait Prompter {
    /// Prompt for a visible line. Re-prompts until the input is
    /// non-empty; fails only when the input stream closes.
    fn prompt_line(&mut self, prompt: &str) -> AuthResult<String>;

    /// Prompt for hidden input; typed characters are not echoed.
    fn prompt_hidden(&mut self, prompt: &str) -> AuthResult<String>;
}

/// Prompter backed by the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt_line(&mut self, prompt: &str) -> AuthResult<String> {
        let stdin = io::stdin();
        loop {
            eprint!("{prompt}");
            io::stderr().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(AuthError::InputClosed);
            }
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }

    fn prompt_hidden(&mut self, prompt: &str) -> AuthResult<String> {
        Ok(rpassword::prompt_password(prompt)?)
    }
}

/// Scripted prompter for driving login flows in tests.
#[cfg(test)]
pub(crate) struct ScriptedPrompter {
    lines: std::collections::VecDeque<String>,
    hidden: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub(crate) fn new(lines: &[&str], hidden: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            hidden: hidden.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn prompt_line(&mut self, _prompt: &str) -> AuthResult<String> {
        self.lines.pop_front().ok_or(AuthError::InputClosed)
    }

    fn prompt_hidden(&mut self, _prompt: &str) -> AuthResult<String> {
        self.hidden.pop_front().ok_or(AuthError::InputClosed)
    }
}
