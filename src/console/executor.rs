//! Command execution state machine
//!
//! Classifies submitted lines into local meta-commands and remote
//! statements, strips prompt prefixes, and tracks the executor phase:
//! editing, waiting for backend acknowledgement, or handed off to the
//! raw-input broker. The bounded wait itself is driven by the console's
//! event pump.

use crate::core::session::ExecutionState;

/// Executor phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutorPhase {
    /// Normal line composition, possibly in a multi-line continuation
    #[default]
    Editing,
    /// A statement was sent; waiting for acknowledgement or timeout
    SubmittedWaiting,
    /// Input ownership temporarily yielded to the raw-input broker
    RawModeHandoff,
}

/// A `%`-prefixed command interpreted locally by the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Start(Option<String>),
    Clear,
    Restart,
    Environments,
    Which,
    Hist(Option<String>),
    SelectHistory,
    ClearHistory,
    Help,
    Quit,
    Unknown(String),
}

impl MetaCommand {
    /// Parse the text after the `%` sentinel
    pub fn parse(rest: &str) -> Self {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        let arg = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match name {
            "start" => MetaCommand::Start(arg),
            "clear" => MetaCommand::Clear,
            "reset" | "restart" => MetaCommand::Restart,
            "envs" | "environments" => MetaCommand::Environments,
            "which" => MetaCommand::Which,
            "hist" | "history" => MetaCommand::Hist(arg),
            "shist" | "shistory" | "select_history" => MetaCommand::SelectHistory,
            "chist" | "chistory" | "clear_history" => MetaCommand::ClearHistory,
            "help" => MetaCommand::Help,
            "quit" | "exit" => MetaCommand::Quit,
            other => MetaCommand::Unknown(other.to_string()),
        }
    }
}

/// Disposition of a submitted statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Execute locally, never transmitted
    Meta(MetaCommand),
    /// Send to the backend
    Remote,
}

/// Decide whether a statement is a meta-command or a remote statement
pub fn classify(stmt: &str) -> Classified {
    let trimmed = stmt.trim();
    match trimmed.strip_prefix('%') {
        Some(rest) => Classified::Meta(MetaCommand::parse(rest)),
        None => Classified::Remote,
    }
}

/// Extract the statement from a raw surface line, stripping the prompt
/// prefix introduced by ps1/ps2
pub fn strip_statement(line: &str, ps1: &str, ps2: &str) -> String {
    let body = line
        .strip_prefix(ps1)
        .or_else(|| line.strip_prefix(ps2))
        .unwrap_or(line);
    body.trim_end().to_string()
}

/// The central state machine driving statement execution.
pub struct CommandExecutor {
    phase: ExecutorPhase,
    pub exec: ExecutionState,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            phase: ExecutorPhase::Editing,
            exec: ExecutionState::new(),
        }
    }

    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    /// A statement was sent on the backend channel
    pub fn mark_submitted(&mut self) {
        self.exec.mark_submitted();
        self.phase = ExecutorPhase::SubmittedWaiting;
    }

    /// The backend acknowledged the statement. `more` flags a structurally
    /// incomplete statement: composition continues instead of execution.
    pub fn complete(&mut self, more: bool) {
        self.exec.complete();
        self.exec.continuation_depth = if more { 1 } else { 0 };
        if self.phase == ExecutorPhase::SubmittedWaiting {
            self.phase = ExecutorPhase::Editing;
        }
    }

    /// The bounded wait expired
    pub fn timed_out(&mut self) {
        self.exec.complete();
        self.phase = ExecutorPhase::Editing;
    }

    /// Connection loss or explicit interrupt
    pub fn interrupt(&mut self) {
        self.exec.interrupt();
        self.phase = ExecutorPhase::Editing;
    }

    /// Raw-input ownership transfer
    pub fn enter_raw_mode(&mut self, echo: bool) {
        self.exec.in_raw_mode = true;
        self.exec.echo_enabled = echo;
        self.phase = ExecutorPhase::RawModeHandoff;
    }

    pub fn leave_raw_mode(&mut self) {
        self.exec.in_raw_mode = false;
        self.exec.echo_enabled = true;
        self.phase = ExecutorPhase::Editing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_meta_vs_remote() {
        assert_eq!(classify("x = 1"), Classified::Remote);
        assert_eq!(classify("%clear"), Classified::Meta(MetaCommand::Clear));
        assert_eq!(
            classify("  %hist 3  "),
            Classified::Meta(MetaCommand::Hist(Some("3".to_string())))
        );
        // '%' only counts as a sentinel at the start
        assert_eq!(classify("a % b"), Classified::Remote);
    }

    #[test]
    fn test_meta_aliases() {
        assert_eq!(MetaCommand::parse("reset"), MetaCommand::Restart);
        assert_eq!(MetaCommand::parse("restart"), MetaCommand::Restart);
        assert_eq!(MetaCommand::parse("envs"), MetaCommand::Environments);
        assert_eq!(MetaCommand::parse("environments"), MetaCommand::Environments);
        assert_eq!(MetaCommand::parse("shist"), MetaCommand::SelectHistory);
        assert_eq!(MetaCommand::parse("select_history"), MetaCommand::SelectHistory);
        assert_eq!(MetaCommand::parse("chistory"), MetaCommand::ClearHistory);
        assert_eq!(MetaCommand::parse("exit"), MetaCommand::Quit);
    }

    #[test]
    fn test_meta_with_argument() {
        assert_eq!(
            MetaCommand::parse("start py311"),
            MetaCommand::Start(Some("py311".to_string()))
        );
        assert_eq!(MetaCommand::parse("start"), MetaCommand::Start(None));
        assert_eq!(MetaCommand::parse("hist"), MetaCommand::Hist(None));
    }

    #[test]
    fn test_unknown_meta() {
        assert_eq!(
            MetaCommand::parse("frobnicate now"),
            MetaCommand::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn test_strip_statement() {
        assert_eq!(strip_statement(">>> x = 1", ">>> ", "... "), "x = 1");
        assert_eq!(strip_statement("...     pass", ">>> ", "... "), "    pass");
        assert_eq!(strip_statement("bare line ", ">>> ", "... "), "bare line");
    }

    #[test]
    fn test_phase_transitions() {
        let mut e = CommandExecutor::new();
        assert_eq!(e.phase(), ExecutorPhase::Editing);

        e.mark_submitted();
        assert_eq!(e.phase(), ExecutorPhase::SubmittedWaiting);
        assert!(e.exec.busy);

        e.complete(false);
        assert_eq!(e.phase(), ExecutorPhase::Editing);
        assert!(!e.exec.busy);
        assert_eq!(e.exec.continuation_depth, 0);

        e.mark_submitted();
        e.complete(true);
        assert_eq!(e.exec.continuation_depth, 1);
    }

    #[test]
    fn test_timeout_clears_busy() {
        let mut e = CommandExecutor::new();
        e.mark_submitted();
        e.timed_out();
        assert!(!e.exec.busy);
        assert_eq!(e.phase(), ExecutorPhase::Editing);
    }

    #[test]
    fn test_raw_mode_handoff() {
        let mut e = CommandExecutor::new();
        e.enter_raw_mode(false);
        assert_eq!(e.phase(), ExecutorPhase::RawModeHandoff);
        assert!(e.exec.in_raw_mode);
        assert!(!e.exec.echo_enabled);

        e.leave_raw_mode();
        assert_eq!(e.phase(), ExecutorPhase::Editing);
        assert!(e.exec.echo_enabled);
    }
}
