//! remcon - An interactive console front-end for remote interpreter backends
//!
//! remcon bridges a text-display surface with an asynchronously-connected
//! interpreter process, emulating the feel of a synchronous REPL: prompts,
//! line editing, history, and inline error reporting all happen locally,
//! while statements travel over a fire-and-forget channel to a backend that
//! may answer late, ask for raw input, or disappear entirely.
//!
//! # Features
//!
//! - **Single-threaded**: all waiting is bounded polling of an event
//!   channel; the thread is never blocked indefinitely
//! - **Prompt-aware editing**: only the trailing live line is editable and
//!   the prompt prefix can never be erased
//! - **Per-session history**: bounded, deduplicated, persisted through a
//!   pluggable key-value store, with three navigation styles
//! - **Incremental history search**: Up/Down on a non-empty line narrows
//!   navigation to entries sharing its prefix
//! - **Meta-commands**: `%`-prefixed commands (`%hist`, `%clear`,
//!   `%restart`, ...) interpreted locally, never transmitted
//! - **Raw-input brokering**: concurrent backend input requests are
//!   serviced strictly in arrival order through a single active prompt
//! - **Output hygiene**: VT control sequences are stripped (state held
//!   across fragment boundaries) and fragments coalesce into one surface
//!   insert per tick
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::mpsc;
//! use remcon::config::ConsoleConfig;
//! use remcon::console::Console;
//! use remcon::core::events::MpscChannel;
//! use remcon::store::MemoryStore;
//! use remcon::surface::BufferSurface;
//!
//! let (cmd_tx, _cmd_rx) = mpsc::channel();
//! let (_ev_tx, ev_rx) = mpsc::channel();
//! let mut console = Console::new(
//!     ConsoleConfig::default(),
//!     BufferSurface::new(),
//!     Box::new(MpscChannel::new(cmd_tx)),
//!     Box::new(MemoryStore::new()),
//!     ev_rx,
//! );
//! loop {
//!     console.tick();
//!     // feed keystrokes via console.handle_key(..), drain
//!     // console.take_requests() ...
//!     # break;
//! }
//! ```

pub mod config;
pub mod console;
pub mod core;
pub mod error;
pub mod history;
pub mod store;
pub mod surface;

pub use config::ConsoleConfig;
pub use console::Console;
pub use self::core::events::{
    BackendChannel, BackendCommand, BackendEvent, CapabilityFlags, ConsoleRequest, MpscChannel,
};
pub use error::{ChannelError, ConsoleError, Result};
pub use history::{HistoryDirection, HistoryStore, HistoryStyle};
pub use store::{KeyValueStore, MemoryStore};
pub use surface::{BufferSurface, Position, TextSurface};
