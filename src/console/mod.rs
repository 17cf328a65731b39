//! The interactive console
//!
//! Bridges a text-display surface with an asynchronously-connected remote
//! interpreter, emulating synchronous line-by-line interaction. All waiting
//! is bounded re-entrant pumping of the inbound event channel; the thread is
//! never blocked indefinitely.

pub mod coalescer;
pub mod discipline;
pub mod executor;
pub mod rawinput;
pub mod search;

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::config::ConsoleConfig;
use crate::core::events::{
    BackendChannel, BackendEvent, CapabilityFlags, ConsoleRequest,
};
use crate::core::filter::ControlSequenceFilter;
use crate::error::ConsoleError;
use crate::core::session::{Session, SubmitMode};
use crate::history::{HistoryDirection, HistoryStore, HistoryStyle};
use crate::store::KeyValueStore;
use crate::surface::TextSurface;

pub use coalescer::OutputCoalescer;
pub use discipline::{EditOutcome, LineEditingDiscipline};
pub use executor::{classify, strip_statement, Classified, CommandExecutor, ExecutorPhase, MetaCommand};
pub use rawinput::{PendingRawInputRequest, RawInputBroker};
pub use search::{IncrementalHistorySearch, SearchStep};

/// History key used before any backend has announced itself
const DEFAULT_SESSION_TYPE: &str = "default";

const HELP_TEXT: &str = "\n\
Console commands (interpreted locally, never sent to the backend):\n\
  %start [env]        start a backend for the named environment\n\
  %clear              clear the screen\n\
  %reset, %restart    restart the backend\n\
  %envs               list known environments\n\
  %which              show the active environment\n\
  %hist [n]           show the last n history entries (default: all)\n\
  %shist              pick a command from history\n\
  %chist              clear history (asks for confirmation)\n\
  %help               this text\n\
  %quit, %exit        close the console (windowed mode only)\n";

/// The console instance: owns the session, history and all sub-components,
/// and mediates between keystrokes, the display surface and the backend.
pub struct Console<S: TextSurface> {
    config: ConsoleConfig,
    surface: S,
    channel: Box<dyn BackendChannel>,
    store: Box<dyn KeyValueStore>,
    events: Receiver<BackendEvent>,

    session: Option<Session>,
    history: HistoryStore,
    executor: CommandExecutor,
    coalescer: OutputCoalescer,
    broker: RawInputBroker,
    discipline: LineEditingDiscipline,
    search: IncrementalHistorySearch,
    filter: ControlSequenceFilter,

    requests: VecDeque<ConsoleRequest>,
    /// Lines of a multi-line block under composition
    pending_block: Vec<String>,
    /// Most recently transmitted statement, for seeding a continuation
    last_submitted: Option<String>,
    /// Prompt writing postponed because a statement is still running
    /// (raw-input handoff)
    deferred_prompt: bool,
}

impl<S: TextSurface> Console<S> {
    pub fn new(
        config: ConsoleConfig,
        mut surface: S,
        channel: Box<dyn BackendChannel>,
        store: Box<dyn KeyValueStore>,
        events: Receiver<BackendEvent>,
    ) -> Self {
        surface.insert_at_end(&config.ps1);
        let history = HistoryStore::new(config.history_capacity, config.history_style);
        let discipline = LineEditingDiscipline::new(&config.ps1, &config.ps2);
        Self {
            config,
            surface,
            channel,
            store,
            events,
            session: None,
            history,
            executor: CommandExecutor::new(),
            coalescer: OutputCoalescer::new(),
            broker: RawInputBroker::new(),
            discipline,
            search: IncrementalHistorySearch::new(),
            filter: ControlSequenceFilter::new(),
            requests: VecDeque::new(),
            pending_block: Vec::new(),
            last_submitted: None,
            deferred_prompt: false,
        }
    }

    /// One host-loop tick: drain backend events, then flush coalesced output
    pub fn tick(&mut self) {
        self.pump_backend_events();
        if self.coalescer.flush_scheduled() {
            self.coalescer.flush(&mut self.surface);
        }
    }

    /// Requests raised toward the host since the last drain
    pub fn take_requests(&mut self) -> Vec<ConsoleRequest> {
        self.requests.drain(..).collect()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn execution(&self) -> &crate::core::session::ExecutionState {
        &self.executor.exec
    }

    fn history_key(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.session_type_id.clone())
            .unwrap_or_else(|| DEFAULT_SESSION_TYPE.to_string())
    }

    fn backend_id(&self) -> String {
        self.history_key()
    }

    fn in_continuation(&self) -> bool {
        self.executor.exec.continuation_depth > 0
    }

    /// Route one keystroke. Raw-input capture takes precedence; otherwise
    /// the editing discipline decides, and submission attempts while a
    /// statement is still busy are rejected here.
    pub fn handle_key(&mut self, key: &KeyEvent) {
        if self.broker.is_awaiting() {
            self.handle_raw_key(key);
            return;
        }
        if self.executor.exec.busy {
            debug!("keystroke ignored while busy");
            return;
        }

        let cont = self.in_continuation();
        match self.discipline.handle_key(&mut self.surface, cont, key) {
            EditOutcome::Submit => self.submit_live_line(),
            EditOutcome::HistoryUp => self.navigate_history(HistoryDirection::Up),
            EditOutcome::HistoryDown => self.navigate_history(HistoryDirection::Down),
            EditOutcome::Complete => self.request_completion(),
            EditOutcome::Consumed | EditOutcome::Ignored => {
                if self.discipline.live_text(&self.surface, cont).is_empty() {
                    self.search.clear();
                }
            }
        }
    }

    fn handle_raw_key(&mut self, key: &KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter => {
                let still_active = self.broker.submit(&*self.channel, &mut self.surface);
                if !still_active {
                    self.executor.leave_raw_mode();
                    if !self.executor.exec.busy {
                        self.write_prompt();
                    }
                }
            }
            KeyCode::Backspace => self.broker.backspace(&mut self.surface),
            KeyCode::Char(ch) if !ctrl && !alt => self.broker.push_char(ch, &mut self.surface),
            _ => {}
        }
    }

    /// Paste text into the live line. Any selection is replaced first
    /// (clamped to the editable region), then the text is handed to the
    /// submission path one logical line at a time; each trailing newline
    /// triggers a submit cycle. An interrupt (e.g. connection loss) during
    /// an earlier line abandons the rest.
    pub fn paste(&mut self, text: &str) {
        if self.broker.is_awaiting() {
            // Raw mode accepts the first pasted line as keystrokes
            for ch in text.chars().take_while(|c| *c != '\n') {
                self.broker.push_char(ch, &mut self.surface);
            }
            return;
        }
        if self.executor.exec.busy {
            return;
        }

        let cont = self.in_continuation();
        self.discipline.delete_selection(&mut self.surface, cont);

        let mut submitted_any = false;
        for segment in text.split_inclusive('\n') {
            if submitted_any && self.executor.exec.interrupt_requested {
                debug!("paste abandoned after interrupt");
                break;
            }
            let cont = self.in_continuation();
            match segment.strip_suffix('\n') {
                Some(line) => {
                    self.discipline.insert_text(&mut self.surface, cont, line);
                    self.submit_live_line();
                    submitted_any = true;
                }
                None => self.discipline.insert_text(&mut self.surface, cont, segment),
            }
        }
    }

    /// Submit whatever is on the live line (Enter pressed)
    fn submit_live_line(&mut self) {
        let live = self.surface.line_count().saturating_sub(1);
        let raw = self.surface.line_text(live);
        let stmt = strip_statement(&raw, &self.config.ps1, &self.config.ps2);

        if self.in_continuation() {
            // Composing a multi-line block: an empty line ends composition
            // and submits the whole block; anything else is a plain newline.
            if stmt.trim().is_empty() {
                let block = std::mem::take(&mut self.pending_block).join("\n");
                self.executor.exec.continuation_depth = 0;
                self.surface.insert_at_end("\n");
                self.execute(&block);
            } else {
                self.pending_block.push(stmt);
                self.executor.exec.continuation_depth += 1;
                self.surface.insert_at_end(&format!("\n{}", self.config.ps2));
            }
            return;
        }

        self.surface.insert_at_end("\n");
        self.execute(&stmt);
    }

    /// Execute one statement: locally for meta-commands, otherwise sent on
    /// the backend channel followed by a bounded, cancellable wait
    fn execute(&mut self, stmt: &str) {
        self.search.clear();
        let stmt = stmt.trim_end();
        if stmt.trim().is_empty() {
            self.write_prompt();
            return;
        }

        let key = self.history_key();
        match classify(stmt) {
            Classified::Meta(meta) => {
                debug!(stmt, "meta command");
                if self.run_meta(meta) {
                    self.history.append(&key, stmt);
                    // Meta-commands stay usable after a disconnect; running
                    // one lifts a pending interrupt
                    self.executor.exec.interrupt_requested = false;
                }
            }
            Classified::Remote => {
                self.history.append(&key, stmt);
                self.last_submitted = Some(stmt.to_string());
                self.executor.mark_submitted();
                let backend_id = self.backend_id();
                match self.channel.send_statement(&backend_id, stmt) {
                    Ok(()) => self.wait_for_completion(),
                    Err(e) => {
                        let err = ConsoleError::Channel(e);
                        warn!("statement send failed: {}", err);
                        self.coalescer.enqueue(&format!("\n{}\n", err));
                        self.executor.interrupt();
                    }
                }
            }
        }

        self.history.after_execute();

        if self.executor.exec.busy {
            // Raw-input handoff while the statement is still running: the
            // prompt is written when the completion event arrives.
            self.deferred_prompt = true;
            return;
        }
        if self.coalescer.flush_scheduled() {
            self.coalescer.flush(&mut self.surface);
        }
        self.write_prompt();
    }

    /// Pump backend events until the statement completes, an interrupt is
    /// raised, input ownership moves to the raw-input broker, or the
    /// configured wall-clock timeout elapses
    fn wait_for_completion(&mut self) {
        let deadline = Instant::now() + Duration::from_millis(self.config.exec_timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));

        loop {
            self.pump_backend_events();
            if !self.executor.exec.busy
                || self.executor.exec.interrupt_requested
                || self.executor.exec.in_raw_mode
            {
                break;
            }
            if Instant::now() >= deadline {
                warn!("{}", ConsoleError::Timeout(self.config.exec_timeout_ms));
                self.executor.timed_out();
                self.coalescer.enqueue(&format!(
                    "\nCommand timed out after {} ms.\n",
                    self.config.exec_timeout_ms
                ));
                break;
            }
            if self.coalescer.flush_scheduled() {
                self.coalescer.flush(&mut self.surface);
            }
            thread::sleep(poll);
        }
    }

    fn pump_backend_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.session.is_some() || self.executor.exec.busy {
                        self.handle_event(BackendEvent::Gone);
                    }
                    break;
                }
            }
        }
    }

    /// Dispatch one inbound backend event. Total over its input domain:
    /// nothing here panics or propagates an error.
    fn handle_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Output(text) => {
                let clean = self.filter.feed(&text);
                if !clean.is_empty() {
                    self.coalescer.enqueue(&clean);
                }
            }

            BackendEvent::Statement { more } => {
                debug!(more, "statement acknowledged");
                // A continuation only makes sense for a multiline backend
                let more = more
                    && self
                        .session
                        .as_ref()
                        .map(|s| s.submit_mode == SubmitMode::InteractiveMultiline)
                        .unwrap_or(true);
                self.executor.complete(more);
                if more {
                    if let Some(last) = self.last_submitted.clone() {
                        self.pending_block = vec![last];
                    }
                } else {
                    self.pending_block.clear();
                }
                if self.deferred_prompt {
                    self.deferred_prompt = false;
                    if self.coalescer.flush_scheduled() {
                        self.coalescer.flush(&mut self.surface);
                    }
                    self.write_prompt();
                }
            }

            BackendEvent::RawInput {
                prompt,
                echo,
                backend_id,
            } => {
                // Output that arrived before the request displays before
                // the prompt
                if self.coalescer.flush_scheduled() {
                    self.coalescer.flush(&mut self.surface);
                }
                self.executor.enter_raw_mode(echo);
                self.broker.request(
                    PendingRawInputRequest {
                        backend_id,
                        prompt,
                        echo,
                    },
                    &mut self.surface,
                );
            }

            BackendEvent::CompletionList { items, matched } => {
                self.requests
                    .push_back(ConsoleRequest::ShowCompletions { items, matched });
            }

            BackendEvent::Exception {
                kind,
                message,
                stack,
            } => {
                let mut text = format!("\n{}: {}\n", kind, message);
                for frame in stack {
                    text.push_str("  ");
                    text.push_str(&frame);
                    text.push('\n');
                }
                self.coalescer.enqueue(&text);
            }

            BackendEvent::SyntaxError {
                message,
                file,
                line,
                col,
            } => {
                self.coalescer.enqueue(&format!(
                    "\nSyntaxError: {} ({}, line {}, col {})\n",
                    message, file, line, col
                ));
            }

            BackendEvent::Signal {
                message,
                file,
                line,
                func,
                args,
            } => {
                self.coalescer.enqueue(&format!(
                    "\n{} ({}:{} in {}({}))\n",
                    message, file, line, func, args
                ));
            }

            BackendEvent::Gone => {
                info!("backend gone");
                if let Some(session) = &self.session {
                    let id = session.session_type_id.clone();
                    self.history.save(&mut *self.store, &id);
                }
                self.executor.interrupt();
                if self.broker.is_awaiting() {
                    self.broker.reset();
                    self.executor.leave_raw_mode();
                }
                self.pending_block.clear();
                self.session = None;
                self.coalescer.enqueue("\nConnection to backend lost.\n");
                if self.deferred_prompt {
                    self.deferred_prompt = false;
                    self.coalescer.flush(&mut self.surface);
                    self.write_prompt();
                }
            }

            BackendEvent::Capabilities {
                flags,
                session_type_id,
                environment,
                working_dir,
            } => {
                info!(%session_type_id, %environment, "backend announced");
                self.history.load(&*self.store, &session_type_id);
                self.session = Some(Session::announce(
                    flags,
                    &session_type_id,
                    &environment,
                    &working_dir,
                ));
                // A reconnected backend resumes normal operation
                self.executor.exec.interrupt_requested = false;
            }
        }
    }

    /// Execute a meta-command locally. Returns true on success; only
    /// successful meta-commands reach history.
    fn run_meta(&mut self, meta: MetaCommand) -> bool {
        match meta {
            MetaCommand::Unknown(name) => {
                self.coalescer
                    .enqueue(&format!("\nCommand '{}' is not supported.\n", name));
                false
            }

            MetaCommand::Hist(arg) => {
                let count = match arg {
                    None => None,
                    Some(s) => match s.parse::<usize>() {
                        Ok(n) if n > 0 => Some(n),
                        _ => {
                            self.coalescer
                                .enqueue(&format!("\nInvalid history count '{}'.\n", s));
                            return false;
                        }
                    },
                };
                let key = self.history_key();
                let entries = self.history.get(&key);
                let mut text = String::from("\n");
                if entries.is_empty() {
                    text.push_str("History is empty.\n");
                } else {
                    let skip = count
                        .map(|n| entries.len().saturating_sub(n))
                        .unwrap_or(0);
                    for (i, cmd) in entries.iter().enumerate().skip(skip) {
                        text.push_str(&format!("{:4}  {}\n", i + 1, cmd));
                    }
                }
                self.coalescer.enqueue(&text);
                true
            }

            MetaCommand::Start(env) => {
                self.requests
                    .push_back(ConsoleRequest::StartEnvironment(env));
                true
            }

            MetaCommand::Clear => {
                self.requests.push_back(ConsoleRequest::ClearScreen);
                true
            }

            MetaCommand::Restart => {
                self.requests.push_back(ConsoleRequest::RestartBackend);
                true
            }

            MetaCommand::Environments => {
                let active = self.session.as_ref().map(|s| s.environment.clone());
                let mut text = String::from("\n");
                if self.config.environments.is_empty() && active.is_none() {
                    text.push_str("No environments configured.\n");
                } else {
                    for env in &self.config.environments {
                        let marker = if Some(env) == active.as_ref() { "*" } else { " " };
                        text.push_str(&format!(" {} {}\n", marker, env));
                    }
                    if let Some(active) = active {
                        if !self.config.environments.contains(&active) {
                            text.push_str(&format!(" * {}\n", active));
                        }
                    }
                }
                self.coalescer.enqueue(&text);
                true
            }

            MetaCommand::Which => {
                let text = match &self.session {
                    Some(s) if s.working_dir.is_empty() => format!("\n{}\n", s.environment),
                    Some(s) => format!("\n{} ({})\n", s.environment, s.working_dir),
                    None => "\nNo backend connected.\n".to_string(),
                };
                self.coalescer.enqueue(&text);
                true
            }

            MetaCommand::SelectHistory => {
                self.requests.push_back(ConsoleRequest::SelectHistory);
                true
            }

            MetaCommand::ClearHistory => {
                self.clear_history(true);
                true
            }

            MetaCommand::Help => {
                self.coalescer.enqueue(HELP_TEXT);
                true
            }

            MetaCommand::Quit => {
                if self.config.windowed {
                    self.requests.push_back(ConsoleRequest::Quit);
                    true
                } else {
                    self.coalescer
                        .enqueue("\nCommand 'quit' is not supported.\n");
                    false
                }
            }
        }
    }

    /// Re-render the prompt on a fresh live line. Hosts call this after
    /// wiping the surface in response to [`ConsoleRequest::ClearScreen`].
    pub fn refresh_prompt(&mut self) {
        self.write_prompt();
    }

    fn write_prompt(&mut self) {
        let prompt = if self.in_continuation() {
            &self.config.ps2
        } else {
            &self.config.ps1
        };
        self.surface.insert_at_end(prompt);
        let line = self.surface.line_count().saturating_sub(1);
        self.surface.ensure_visible(line);
    }

    fn navigate_history(&mut self, direction: HistoryDirection) {
        if self.history.style() == HistoryStyle::Disabled {
            return;
        }
        let cont = self.in_continuation();
        let key = self.history_key();
        let live = self.discipline.live_text(&self.surface, cont);

        // A prefix session in progress narrows navigation to matches
        if let Some(prefix) = self.search.active_prefix(&live) {
            self.navigate_by_prefix(&key, direction, &prefix, cont);
            return;
        }

        let entries = self.history.get(&key);
        let at_cursor = {
            let idx = self.history.index();
            idx >= 0 && entries.get(idx as usize).map(|e| e.as_str()) == Some(live.as_str())
        };

        if live.is_empty() || at_cursor {
            // Plain one-by-one navigation
            self.search.clear();
            match self.history.navigate(&key, direction, false) {
                Some(entry) => self.discipline.set_live_text(&mut self.surface, cont, &entry),
                None => {
                    if self.history.index() == -1 {
                        self.discipline.set_live_text(&mut self.surface, cont, "");
                    }
                }
            }
        } else {
            // First Up/Down on a non-empty, non-matching line captures it
            let prefix = self.search.prefix_for(&live);
            self.navigate_by_prefix(&key, direction, &prefix, cont);
        }
    }

    fn navigate_by_prefix(
        &mut self,
        key: &str,
        direction: HistoryDirection,
        prefix: &str,
        cont: bool,
    ) {
        let entries = self.history.get(key).to_vec();
        match self.search.find(&entries, self.history.index(), direction, prefix) {
            SearchStep::Entry(i) => {
                self.history.set_index(i as isize);
                self.discipline
                    .set_live_text(&mut self.surface, cont, &entries[i]);
            }
            SearchStep::LiveLine => {
                self.history.set_index(-1);
                self.discipline.set_live_text(&mut self.surface, cont, prefix);
            }
            SearchStep::Stay => {}
        }
    }

    fn request_completion(&mut self) {
        let cont = self.in_continuation();
        let live = self.discipline.live_text(&self.surface, cont);
        if live.is_empty() {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        if !session
            .capabilities
            .contains(CapabilityFlags::REMOTE_COMPLETION)
        {
            return;
        }
        if let Err(e) = self
            .channel
            .send_completion_request(&session.session_type_id, &live)
        {
            warn!("completion request failed: {}", e);
        }
    }

    /// Clear the history for the current session type. With
    /// `require_confirmation`, the host is asked first via
    /// [`ConsoleRequest::ConfirmClearHistory`] and is expected to call back
    /// with `require_confirmation = false`.
    pub fn clear_history(&mut self, require_confirmation: bool) {
        if require_confirmation {
            self.requests.push_back(ConsoleRequest::ConfirmClearHistory);
            return;
        }
        let key = self.history_key();
        self.history.clear(&key);
        self.history.save(&mut *self.store, &key);
    }

    /// Place an arbitrary command on the live line as if it were the entry
    /// at the current history cursor, without appending it to the list
    pub fn select_history(&mut self, cmd: &str) {
        let cmd = self.history.select(cmd);
        let cont = self.in_continuation();
        self.discipline.set_live_text(&mut self.surface, cont, &cmd);
    }

    /// Persist the history of the current session type
    pub fn save_history(&mut self) {
        let key = self.history_key();
        self.history.save(&mut *self.store, &key);
    }

    /// Raise an interrupt: clears the busy wait and abandons any queued
    /// paste lines and continuation state
    pub fn interrupt(&mut self) {
        self.executor.interrupt();
        self.pending_block.clear();
    }
}
