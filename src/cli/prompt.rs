// src/cli/prompt.rs

//! User prompts behind a trait, so flows can be driven by a script in tests.
//!
//! Every method returns `Ok(None)` when the user dismisses the prompt.

use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::fmt::Debug;
use std::io::ErrorKind;
use thiserror::Error;

/// Checks a typed value; `Err` carries the message shown under the prompt.
pub type Validator = fn(&str) -> Result<(), String>;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

/// A free-text question.
#[derive(Debug, Clone, Copy)]
pub struct InputRequest<'a> {
    pub prompt: &'a str,
    pub placeholder: Option<&'a str>,
    pub allow_empty: bool,
    pub validator: Option<Validator>,
}

impl<'a> InputRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            placeholder: None,
            allow_empty: false,
            validator: None,
        }
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Applies the validator the way the terminal prompt does.
    pub fn check(&self, value: &str) -> Result<(), String> {
        if value.is_empty() && self.allow_empty {
            return Ok(());
        }
        match self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

pub trait Prompter: Send + Sync + Debug {
    fn input(&self, request: &InputRequest<'_>) -> Result<Option<String>, PromptError>;

    /// Index into `items` of the chosen entry.
    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<Option<bool>, PromptError>;
}

/// Terminal prompts with dialoguer's colorful theme.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

/// Ctrl+C and Esc surface as interrupted I/O; both mean "dismissed".
fn dismissed<T>(result: Result<T, dialoguer::Error>) -> Result<Option<T>, PromptError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, request: &InputRequest<'_>) -> Result<Option<String>, PromptError> {
        let theme = ColorfulTheme::default();
        let prompt = match request.placeholder {
            Some(hint) => format!("{} ({})", request.prompt, hint),
            None => request.prompt.to_string(),
        };
        let checked = *request;
        let answer = Input::<String>::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(move |value: &String| -> Result<(), String> {
                if value.is_empty() {
                    Ok(())
                } else {
                    checked.check(value)
                }
            })
            .interact_text();

        // An empty answer where one is required means "never mind".
        Ok(dismissed(answer)?.filter(|value| request.allow_empty || !value.is_empty()))
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError> {
        let answer = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .max_length(15)
            .interact_opt();
        Ok(dismissed(answer)?.flatten())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<Option<bool>, PromptError> {
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact_opt();
        Ok(dismissed(answer)?.flatten())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One scripted reaction to a prompt.
    #[derive(Debug, Clone)]
    pub(crate) enum Answer {
        Text(&'static str),
        /// Select the entry whose label equals this text.
        Pick(&'static str),
        Yes,
        No,
        Dismiss,
    }

    /// Replays answers in order and records every prompt it was shown.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedPrompter {
        answers: Mutex<VecDeque<Answer>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        pub(crate) fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                asked: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }

        fn next(&self, prompt: &str) -> Answer {
            self.asked.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted answer for prompt '{}'", prompt))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn input(&self, request: &InputRequest<'_>) -> Result<Option<String>, PromptError> {
            match self.next(request.prompt) {
                Answer::Text(text) => {
                    if !text.is_empty() {
                        if let Err(message) = request.check(text) {
                            panic!("scripted answer '{}' rejected: {}", text, message);
                        }
                    }
                    Ok(Some(text.to_string()).filter(|v| request.allow_empty || !v.is_empty()))
                }
                Answer::Dismiss => Ok(None),
                other => panic!("unexpected answer {:?} for input '{}'", other, request.prompt),
            }
        }

        fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError> {
            match self.next(prompt) {
                Answer::Pick(label) => Ok(Some(
                    items
                        .iter()
                        .position(|item| item == label)
                        .unwrap_or_else(|| panic!("'{}' not among {:?}", label, items)),
                )),
                Answer::Dismiss => Ok(None),
                other => panic!("unexpected answer {:?} for select '{}'", other, prompt),
            }
        }

        fn confirm(&self, prompt: &str, _default: bool) -> Result<Option<bool>, PromptError> {
            match self.next(prompt) {
                Answer::Yes => Ok(Some(true)),
                Answer::No => Ok(Some(false)),
                Answer::Dismiss => Ok(None),
                other => panic!("unexpected answer {:?} for confirm '{}'", other, prompt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: &str) -> Result<(), String> {
        if value.chars().all(char::is_alphanumeric) {
            Ok(())
        } else {
            Err("letters only".to_string())
        }
    }

    #[test]
    fn test_check_applies_validator() {
        let request = InputRequest::new("Name").validate(word);
        assert!(request.check("abc").is_ok());
        assert_eq!(request.check("a b"), Err("letters only".to_string()));
    }

    #[test]
    fn test_empty_bypasses_validator_only_when_allowed() {
        fn never(_: &str) -> Result<(), String> {
            Err("no".to_string())
        }
        assert!(InputRequest::new("Deps").allow_empty().validate(never).check("").is_ok());
        assert!(InputRequest::new("Deps").validate(never).check("").is_err());
    }
}
