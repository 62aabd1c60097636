pub mod checks;
pub mod classes;
pub mod init;
pub mod misc;
pub mod notes;
pub mod ratings;
pub mod remote;
pub mod scales;
pub mod seating;
pub mod students;
pub mod sync;
pub mod transfer;

use dialoguer::Confirm;

use crate::errors::CliError;
use crate::ui::UiContext;

/// Ask before a destructive operation; refuses without a terminal.
pub fn confirm(ui_ctx: &UiContext, prompt: &str) -> anyhow::Result<bool> {
    if !ui_ctx.is_interactive() {
        return Err(CliError::invalid_input(format!(
            "{}\nRefusing without a terminal; pass --yes to confirm.",
            prompt
        ))
        .into());
    }
    let answer = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(answer)
}
