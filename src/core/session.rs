//! Session state
//!
//! One `Session` value per connected backend, owned by the console and
//! threaded explicitly through the executor. Capabilities and environment
//! are replaced wholesale whenever a backend announces itself; the session
//! is dropped on disconnect.

use super::events::CapabilityFlags;

/// How submitted text reaches the backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmitMode {
    /// Each Enter submits one statement
    #[default]
    Immediate,
    /// Statements may span multiple lines before one logical submission
    InteractiveMultiline,
}

/// State describing the currently connected backend
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity used for history keying and outbound addressing
    pub session_type_id: String,
    pub submit_mode: SubmitMode,
    pub capabilities: CapabilityFlags,
    /// Name of the active interpreter environment
    pub environment: String,
    pub working_dir: String,
}

impl Session {
    /// Build a session from a backend announcement
    pub fn announce(
        flags: CapabilityFlags,
        session_type_id: &str,
        environment: &str,
        working_dir: &str,
    ) -> Self {
        let submit_mode = if flags.contains(CapabilityFlags::MULTILINE) {
            SubmitMode::InteractiveMultiline
        } else {
            SubmitMode::Immediate
        };
        Self {
            session_type_id: session_type_id.to_string(),
            submit_mode,
            capabilities: flags,
            environment: environment.to_string(),
            working_dir: working_dir.to_string(),
        }
    }
}

/// Execution bookkeeping, exactly one per session.
///
/// `busy` is true only between submission and backend acknowledgement or
/// timeout, and is always cleared before the next line can be submitted.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub busy: bool,
    pub interrupt_requested: bool,
    pub in_raw_mode: bool,
    pub echo_enabled: bool,
    pub continuation_depth: u32,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self {
            echo_enabled: true,
            ..Self::default()
        }
    }

    /// Enter the submitted-waiting window
    pub fn mark_submitted(&mut self) {
        self.busy = true;
        self.interrupt_requested = false;
    }

    /// Backend acknowledged the statement
    pub fn complete(&mut self) {
        self.busy = false;
    }

    /// Connection loss or client error: clear everything that could keep
    /// the console waiting
    pub fn interrupt(&mut self) {
        self.busy = false;
        self.interrupt_requested = true;
        self.continuation_depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announce_replaces_wholesale() {
        let session = Session::announce(
            CapabilityFlags::REMOTE_COMPLETION | CapabilityFlags::MULTILINE,
            "python",
            "py311",
            "/home/ada/project",
        );
        assert_eq!(session.session_type_id, "python");
        assert_eq!(session.environment, "py311");
        assert_eq!(session.working_dir, "/home/ada/project");
        assert_eq!(session.submit_mode, SubmitMode::InteractiveMultiline);
        assert!(session.capabilities.contains(CapabilityFlags::REMOTE_COMPLETION));
    }

    #[test]
    fn test_interrupt_clears_wait_state() {
        let mut exec = ExecutionState::new();
        exec.mark_submitted();
        exec.continuation_depth = 2;

        exec.interrupt();
        assert!(!exec.busy);
        assert!(exec.interrupt_requested);
        assert_eq!(exec.continuation_depth, 0);
    }

    #[test]
    fn test_submit_resets_interrupt_flag() {
        let mut exec = ExecutionState::new();
        exec.interrupt();
        exec.mark_submitted();
        assert!(exec.busy);
        assert!(!exec.interrupt_requested);
    }
}
