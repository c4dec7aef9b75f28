// src/core/prompter.rs

use dialoguer::{Confirm, Input, Password, Select, theme::ColorfulTheme};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Operation cancelled by user.")]
    Cancelled,
    #[error("Nothing to choose from: {0}")]
    NoChoices(String),
    #[error("User Interface Error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

/// Interactive questions asked while resolving a configuration.
///
/// Every operation either returns the answer or `PromptError::Cancelled` when the
/// user backs out.
pub trait Prompter {
    /// Returns the index of the chosen item.
    fn choose_one(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Free-text entry. `secret` input is not echoed.
    fn free_text(&self, prompt: &str, secret: bool) -> Result<String, PromptError>;
}

/// Terminal prompts backed by `dialoguer`. Escape or `q` cancels a prompt.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn choose_one(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        if items.is_empty() {
            return Err(PromptError::NoChoices(prompt.to_string()));
        }
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }

    fn free_text(&self, prompt: &str, secret: bool) -> Result<String, PromptError> {
        let value = if secret {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()?
        } else {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()?
        };
        // An empty answer is how a text prompt gets dismissed.
        if value.trim().is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(value)
    }
}
