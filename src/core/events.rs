//! Backend events and channel boundary
//!
//! The upstream signal/slot wiring becomes explicit typed messages: the
//! backend pushes `BackendEvent`s over an `mpsc` channel that the console
//! drains once per event-loop tick, and the console sends outbound traffic
//! through the `BackendChannel` capability (fire-and-forget).

use std::sync::mpsc::Sender;

use bitflags::bitflags;

use crate::error::ChannelError;

bitflags! {
    /// Capabilities announced by a backend when it connects
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CapabilityFlags: u32 {
        /// Backend answers completion requests
        const REMOTE_COMPLETION = 0b0001;
        /// Backend may request raw input lines
        const RAW_INPUT         = 0b0010;
        /// Backend honors interrupts mid-statement
        const INTERRUPT         = 0b0100;
        /// Backend composes multi-line blocks (`more` flag)
        const MULTILINE         = 0b1000;
    }
}

/// Inbound events emitted by the backend
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// The last submitted statement was acknowledged. `more` signals that it
    /// was structurally incomplete and a continuation is expected.
    Statement { more: bool },
    /// The backend asks for one line of user text, outside normal statement
    /// submission. `echo = false` means keystrokes must not be rendered.
    RawInput {
        prompt: String,
        echo: bool,
        backend_id: String,
    },
    /// A fragment of output text
    Output(String),
    /// Completion candidates for an earlier completion request
    CompletionList { items: Vec<String>, matched: String },
    /// An exception raised while executing a statement
    Exception {
        kind: String,
        message: String,
        stack: Vec<String>,
    },
    /// A syntax error in the submitted statement
    SyntaxError {
        message: String,
        file: String,
        line: u32,
        col: u32,
    },
    /// A signal/alert raised by the interpreter
    Signal {
        message: String,
        file: String,
        line: u32,
        func: String,
        args: String,
    },
    /// The backend disappeared (process died, connection dropped)
    Gone,
    /// A backend announced itself with its capabilities
    Capabilities {
        flags: CapabilityFlags,
        session_type_id: String,
        environment: String,
        /// Working directory of the interpreter process, empty if unknown
        working_dir: String,
    },
}

/// Requests the console raises toward its host, drained once per tick.
/// These replace upstream signal emissions toward window chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleRequest {
    /// `%clear`: wipe the display surface
    ClearScreen,
    /// `%start [env]`: launch a backend for the named environment
    StartEnvironment(Option<String>),
    /// `%reset` / `%restart`: restart the current backend
    RestartBackend,
    /// `%shist`: open a history picker (answered via `select_history`)
    SelectHistory,
    /// `%chist`: ask the user before clearing history
    ConfirmClearHistory,
    /// Completion candidates arrived for the live line
    ShowCompletions { items: Vec<String>, matched: String },
    /// `%quit` / `%exit` in windowed mode
    Quit,
}

/// Outbound message boundary toward the backend.
///
/// All sends are fire-and-forget: a failure is reported to the caller so it
/// can log and recover, but never blocks or panics.
pub trait BackendChannel {
    /// Submit a statement for execution
    fn send_statement(&self, backend_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Answer a raw-input request
    fn send_raw_input(&self, backend_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Ask for completion candidates for a partial line
    fn send_completion_request(&self, backend_id: &str, partial: &str)
        -> Result<(), ChannelError>;
}

/// Outbound messages as carried by [`MpscChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Statement { backend_id: String, text: String },
    RawInput { backend_id: String, text: String },
    CompletionRequest { backend_id: String, partial: String },
}

/// `BackendChannel` over a standard `mpsc` sender. The demo front-end and
/// the test suite both read the paired receiver.
pub struct MpscChannel {
    tx: Sender<BackendCommand>,
}

impl MpscChannel {
    pub fn new(tx: Sender<BackendCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: BackendCommand) -> Result<(), ChannelError> {
        self.tx.send(command).map_err(|_| ChannelError::Closed)
    }
}

impl BackendChannel for MpscChannel {
    fn send_statement(&self, backend_id: &str, text: &str) -> Result<(), ChannelError> {
        self.send(BackendCommand::Statement {
            backend_id: backend_id.to_string(),
            text: text.to_string(),
        })
    }

    fn send_raw_input(&self, backend_id: &str, text: &str) -> Result<(), ChannelError> {
        self.send(BackendCommand::RawInput {
            backend_id: backend_id.to_string(),
            text: text.to_string(),
        })
    }

    fn send_completion_request(
        &self,
        backend_id: &str,
        partial: &str,
    ) -> Result<(), ChannelError> {
        self.send(BackendCommand::CompletionRequest {
            backend_id: backend_id.to_string(),
            partial: partial.to_string(),
        })
    }
}
