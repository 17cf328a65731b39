//! remcon demo front-end
//!
//! Runs the console against a built-in echo backend on a raw-mode terminal.
//! The backend lives on its own thread and talks to the console exclusively
//! through the command/event channel pair, exactly like a real interpreter
//! process would.
//!
//! # Quick Start
//!
//! ```text
//! remcon                # default environment
//! remcon -e py311       # named environment
//! remcon -t 5000        # 5s acknowledgement timeout
//! ```
//!
//! Inside the console:
//!
//! | Key / command | Action |
//! |---------------|--------|
//! | Enter         | submit the live line |
//! | Up/Down       | history (prefix-narrowed on a non-empty line) |
//! | Tab           | remote completion |
//! | Ctrl+C        | interrupt |
//! | Ctrl+V        | paste from clipboard |
//! | Ctrl+D        | quit |
//! | %help         | list meta-commands |

use std::env;
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::execute;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use unicode_width::UnicodeWidthChar;

use remcon::config::{config_dir, ConsoleConfig};
use remcon::console::Console;
use remcon::core::events::{
    BackendCommand, BackendEvent, CapabilityFlags, ConsoleRequest, MpscChannel,
};
use remcon::store::MemoryStore;
use remcon::surface::{BufferSurface, Position, TextSurface};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Demo configuration from the command line
#[derive(Default)]
struct DemoConfig {
    /// Environment name announced by the echo backend
    environment: Option<String>,
    /// Acknowledgement timeout override, in milliseconds
    timeout_ms: Option<u64>,
}

fn print_version() {
    eprintln!("remcon {}", VERSION);
}

fn print_help() {
    eprintln!(
        "remcon {} - An interactive console front-end for remote interpreter backends",
        VERSION
    );
    eprintln!();
    eprintln!("Usage: remcon [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e, --env <NAME>      Environment name for the demo backend");
    eprintln!("  -t, --timeout <MS>    Acknowledgement timeout in milliseconds");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Console keybindings:");
    eprintln!("  Enter                 Submit the live line");
    eprintln!("  Up/Down               History (prefix-narrowed on a non-empty line)");
    eprintln!("  Tab                   Remote completion");
    eprintln!("  Ctrl+C                Interrupt");
    eprintln!("  Ctrl+V                Paste from clipboard");
    eprintln!("  Ctrl+D                Quit");
    eprintln!();
    eprintln!("Meta-commands (type %help inside the console for the full list):");
    eprintln!("  %hist [n]  %clear  %restart  %envs  %which  %quit");
    eprintln!();
    eprintln!("Configuration: ~/.remcon/config.toml");
    eprintln!("Log file:      ~/.remcon/remcon.log");
}

fn parse_args() -> Result<DemoConfig, String> {
    let args: Vec<String> = env::args().collect();
    let mut config = DemoConfig::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-e" | "--env" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing environment argument".to_string());
                }
                config.environment = Some(args[i].clone());
            }
            "-t" | "--timeout" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing timeout argument".to_string());
                }
                config.timeout_ms = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid timeout: {}", args[i]))?,
                );
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Terminal-backed display surface.
///
/// Keeps a [`BufferSurface`] as the source of truth and mirrors it onto the
/// terminal: completed lines are printed once, the live line is redrawn in
/// place after every mutation. All terminal writes are best-effort.
struct TermSurface {
    buffer: BufferSurface,
    out: io::Stdout,
    /// Buffer lines already printed with a trailing newline
    printed: usize,
}

impl TermSurface {
    fn new() -> Self {
        Self {
            buffer: BufferSurface::new(),
            out: io::stdout(),
            printed: 0,
        }
    }

    /// Wipe both the terminal and the line bookkeeping (`%clear`)
    fn clear_screen(&mut self) {
        self.buffer = BufferSurface::new();
        self.printed = 0;
        let _ = execute!(
            self.out,
            Clear(ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        );
    }

    /// Display width of the first `cols` characters of `text`
    fn display_col(text: &str, cols: usize) -> u16 {
        text.chars()
            .take(cols)
            .map(|ch| ch.width().unwrap_or(0))
            .sum::<usize>() as u16
    }

    /// Print newly completed lines, then redraw the live line in place and
    /// park the terminal cursor at the buffer cursor's display column
    fn sync(&mut self) {
        let live = self.buffer.line_count() - 1;
        while self.printed < live {
            let text = self.buffer.line_text(self.printed);
            let _ = execute!(
                self.out,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(&text),
                Print("\r\n")
            );
            self.printed += 1;
        }

        let text = self.buffer.line_text(live);
        let (cursor_line, cursor_col) = self.buffer.cursor_position();
        let col = if cursor_line == live {
            Self::display_col(&text, cursor_col)
        } else {
            Self::display_col(&text, text.chars().count())
        };
        let _ = execute!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(&text),
            MoveToColumn(col)
        );
        let _ = self.out.flush();
    }
}

impl TextSurface for TermSurface {
    fn insert_at_end(&mut self, text: &str) {
        self.buffer.insert_at_end(text);
        self.sync();
    }

    fn cursor_position(&self) -> Position {
        self.buffer.cursor_position()
    }

    fn set_cursor_position(&mut self, line: usize, col: usize) {
        self.buffer.set_cursor_position(line, col);
        self.sync();
    }

    fn selection(&self) -> Option<(Position, Position)> {
        self.buffer.selection()
    }

    fn set_selection(&mut self, start: Position, end: Position) {
        self.buffer.set_selection(start, end);
    }

    fn clear_selection(&mut self) {
        self.buffer.clear_selection();
    }

    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn line_text(&self, n: usize) -> String {
        self.buffer.line_text(n)
    }

    fn delete_line_right(&mut self) {
        self.buffer.delete_line_right();
        self.sync();
    }

    fn ensure_visible(&mut self, _line: usize) {
        // The terminal scrolls on its own as lines are printed
    }

    fn replace_range(&mut self, start: Position, end: Position, text: &str) {
        self.buffer.replace_range(start, end, text);
        self.sync();
    }
}

/// Built-in echo backend.
///
/// Announces itself, echoes statements back as output, flags lines ending in
/// `:` as structurally incomplete, answers `input()` with a raw-input
/// request, and serves completion candidates from a small keyword list.
/// Working directory reported in backend announcements
fn working_dir() -> String {
    env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn run_echo_backend(rx: Receiver<BackendCommand>, tx: Sender<BackendEvent>, environment: String) {
    const COMPLETIONS: &[&str] = &[
        "print", "input", "import", "for", "while", "def", "class", "return",
    ];

    let _ = tx.send(BackendEvent::Capabilities {
        flags: CapabilityFlags::REMOTE_COMPLETION
            | CapabilityFlags::RAW_INPUT
            | CapabilityFlags::INTERRUPT
            | CapabilityFlags::MULTILINE,
        session_type_id: "echo".to_string(),
        environment,
        working_dir: working_dir(),
    });

    for cmd in rx {
        match cmd {
            BackendCommand::Statement { backend_id, text } => {
                let single_line = !text.contains('\n');
                if single_line && text.trim_end().ends_with(':') {
                    let _ = tx.send(BackendEvent::Statement { more: true });
                } else if text.trim() == "input()" {
                    let _ = tx.send(BackendEvent::RawInput {
                        prompt: "? ".to_string(),
                        echo: true,
                        backend_id,
                    });
                    // The answer arrives as a RawInput command below
                } else {
                    let _ = tx.send(BackendEvent::Output(format!("{}\n", text)));
                    let _ = tx.send(BackendEvent::Statement { more: false });
                }
            }
            BackendCommand::RawInput { text, .. } => {
                let _ = tx.send(BackendEvent::Output(format!("'{}'\n", text)));
                let _ = tx.send(BackendEvent::Statement { more: false });
            }
            BackendCommand::CompletionRequest { partial, .. } => {
                let items: Vec<String> = COMPLETIONS
                    .iter()
                    .filter(|k| k.starts_with(&partial))
                    .map(|k| k.to_string())
                    .collect();
                if !items.is_empty() {
                    let _ = tx.send(BackendEvent::CompletionList {
                        items,
                        matched: partial,
                    });
                }
            }
        }
    }
    info!("echo backend stopped");
}

fn read_clipboard() -> Option<String> {
    match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("clipboard unavailable: {}", e);
            None
        }
    }
}

/// Block for one key press (used by the tiny modal prompts below)
fn read_key() -> Option<KeyCode> {
    loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return Some(key.code),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

/// `%shist`: number the most recent entries on the surface and let the user
/// pick one by digit
fn pick_history(console: &mut Console<TermSurface>) {
    let id = console
        .session()
        .map(|s| s.session_type_id.clone())
        .unwrap_or_else(|| "default".to_string());
    let entries: Vec<String> = console.history().get(&id).to_vec();
    if entries.is_empty() {
        return;
    }

    let recent: Vec<&String> = entries.iter().rev().take(9).collect();
    let live = console.surface().line_text(console.surface().line_count() - 1);
    let mut listing = String::from("\n");
    for (i, cmd) in recent.iter().enumerate() {
        listing.push_str(&format!("  {}  {}\n", i + 1, cmd));
    }
    listing.push_str("pick [1-9], any other key cancels\n");
    listing.push_str(&live);
    console.surface_mut().insert_at_end(&listing);

    if let Some(KeyCode::Char(ch)) = read_key() {
        if let Some(n) = ch.to_digit(10) {
            if n >= 1 && (n as usize) <= recent.len() {
                let cmd = recent[n as usize - 1].clone();
                console.select_history(&cmd);
            }
        }
    }
}

/// `%chist`: confirm, then clear
fn confirm_clear_history(console: &mut Console<TermSurface>) {
    let live = console.surface().line_text(console.surface().line_count() - 1);
    console
        .surface_mut()
        .insert_at_end(&format!("\nClear history? [y/N]\n{}", live));
    if let Some(KeyCode::Char('y')) = read_key() {
        console.clear_history(false);
        info!("history cleared");
    }
}

fn show_completions(console: &mut Console<TermSurface>, items: &[String]) {
    let live = console.surface().line_text(console.surface().line_count() - 1);
    let mut text = String::from("\n");
    text.push_str(&items.join("  "));
    text.push('\n');
    text.push_str(&live);
    console.surface_mut().insert_at_end(&text);
}

fn main() -> anyhow::Result<()> {
    let demo = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Log to ~/.remcon/remcon.log (stdout belongs to the console)
    let log_file = config_dir()
        .map(|d| d.join("remcon.log"))
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    info!("remcon {} starting", VERSION);

    let mut config = ConsoleConfig::load();
    config.windowed = true;
    if let Some(ms) = demo.timeout_ms {
        config.exec_timeout_ms = ms;
    }
    let environment = demo
        .environment
        .clone()
        .or_else(|| config.environments.first().cloned())
        .unwrap_or_else(|| "default".to_string());
    if !config.environments.contains(&environment) {
        config.environments.push(environment.clone());
    }

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (ev_tx, ev_rx) = mpsc::channel();
    {
        let ev_tx = ev_tx.clone();
        let environment = environment.clone();
        thread::spawn(move || run_echo_backend(cmd_rx, ev_tx, environment));
    }

    let poll_timeout = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut console = Console::new(
        config,
        TermSurface::new(),
        Box::new(MpscChannel::new(cmd_tx)),
        Box::new(MemoryStore::new()),
        ev_rx,
    );

    terminal::enable_raw_mode()?;
    let _ = execute!(io::stdout(), event::EnableBracketedPaste);
    let run = run_console(&mut console, &ev_tx, &environment, poll_timeout);
    console.save_history();
    let _ = execute!(io::stdout(), event::DisableBracketedPaste);
    let _ = terminal::disable_raw_mode();
    println!();
    info!("remcon exiting");
    run
}

fn run_console(
    console: &mut Console<TermSurface>,
    ev_tx: &Sender<BackendEvent>,
    environment: &str,
    poll_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        console.tick();

        let mut quit = false;
        for request in console.take_requests() {
            match request {
                ConsoleRequest::Quit => quit = true,
                ConsoleRequest::ClearScreen => {
                    console.surface_mut().clear_screen();
                    console.refresh_prompt();
                }
                ConsoleRequest::StartEnvironment(env) => {
                    let env = env.unwrap_or_else(|| environment.to_string());
                    info!(%env, "starting backend");
                    let _ = ev_tx.send(BackendEvent::Capabilities {
                        flags: CapabilityFlags::REMOTE_COMPLETION
                            | CapabilityFlags::RAW_INPUT
                            | CapabilityFlags::INTERRUPT
                            | CapabilityFlags::MULTILINE,
                        session_type_id: "echo".to_string(),
                        environment: env,
                        working_dir: working_dir(),
                    });
                }
                ConsoleRequest::RestartBackend => {
                    info!("restarting backend");
                    let _ = ev_tx.send(BackendEvent::Gone);
                    let _ = ev_tx.send(BackendEvent::Capabilities {
                        flags: CapabilityFlags::REMOTE_COMPLETION
                            | CapabilityFlags::RAW_INPUT
                            | CapabilityFlags::INTERRUPT
                            | CapabilityFlags::MULTILINE,
                        session_type_id: "echo".to_string(),
                        environment: environment.to_string(),
                        working_dir: working_dir(),
                    });
                }
                ConsoleRequest::SelectHistory => pick_history(console),
                ConsoleRequest::ConfirmClearHistory => confirm_clear_history(console),
                ConsoleRequest::ShowCompletions { items, .. } => {
                    show_completions(console, &items)
                }
            }
        }
        if quit {
            break;
        }

        if !event::poll(poll_timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Char('d') if ctrl => break,
                    KeyCode::Char('c') if ctrl => console.interrupt(),
                    KeyCode::Char('v') if ctrl => {
                        if let Some(text) = read_clipboard() {
                            console.paste(&text);
                        }
                    }
                    _ => console.handle_key(&key),
                }
            }
            Event::Paste(text) => console.paste(&text),
            _ => {}
        }
    }
    Ok(())
}
