use inquire::Confirm;

use crate::InstallerError;

/// Asks the person running the installer a yes/no question.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, InstallerError>;
}

/// Prompts on the terminal.
#[derive(Debug, Default)]
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, InstallerError> {
        Confirm::new(message)
            .with_default(default)
            .prompt()
            .map_err(|e| InstallerError::Prompt(e.to_string()))
    }
}

/// Answers every question the same way (`--yes` / `--no`).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, InstallerError> {
        log::debug!("{message} -> {}", if self.0 { "yes" } else { "no" });
        Ok(self.0)
    }
}
