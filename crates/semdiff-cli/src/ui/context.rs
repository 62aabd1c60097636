//! Output mode and terminal detection.

use std::io::IsTerminal;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `--json`: one JSON document, nothing else on stdout
    Json,
    /// `key=value` lines and bare tables for scripts and pipes
    Plain,
    /// Badges, headers and styled tables on a real terminal
    Pretty,
}

impl OutputMode {
    /// `--json` wins; otherwise pretty only on a capable terminal.
    fn pick(json: bool, capable_terminal: bool) -> Self {
        match (json, capable_terminal) {
            (true, _) => Self::Json,
            (false, true) => Self::Pretty,
            (false, false) => Self::Plain,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_pretty(&self) -> bool {
        matches!(self, Self::Pretty)
    }
}

#[derive(Debug, Clone)]
pub struct UiContext {
    pub mode: OutputMode,
    pub color: bool,
    /// Both stdin and stdout are terminals, so dialoguer prompts can run.
    pub interactive: bool,
}

impl UiContext {
    pub fn detect(json: bool, no_color_flag: bool) -> Self {
        let stdout_tty = std::io::stdout().is_terminal();
        let dumb = std::env::var("TERM").is_ok_and(|v| v == "dumb");
        let capable = stdout_tty && !dumb;

        Self {
            mode: OutputMode::pick(json, capable),
            color: capable && !no_color_flag && std::env::var_os("NO_COLOR").is_none(),
            interactive: stdout_tty && std::io::stdin().is_terminal(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Spinners only draw in pretty mode.
    pub fn allows_animation(&self) -> bool {
        self.mode.is_pretty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_flag_beats_terminal() {
        assert_eq!(OutputMode::pick(true, true), OutputMode::Json);
        assert_eq!(OutputMode::pick(true, false), OutputMode::Json);
    }

    #[test]
    fn test_pipes_get_plain_output() {
        assert_eq!(OutputMode::pick(false, false), OutputMode::Plain);
        assert_eq!(OutputMode::pick(false, true), OutputMode::Pretty);
    }

    #[test]
    fn test_no_color_flag_disables_color() {
        assert!(!UiContext::detect(false, true).color);
    }
}
