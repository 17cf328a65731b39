//! Core types: backend events, session state, control-sequence filtering

pub mod events;
pub mod filter;
pub mod session;

pub use events::{
    BackendChannel, BackendCommand, BackendEvent, CapabilityFlags, ConsoleRequest, MpscChannel,
};
pub use filter::ControlSequenceFilter;
pub use session::{ExecutionState, Session, SubmitMode};
