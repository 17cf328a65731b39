//! Raw-input brokering
//!
//! Multiple backend identities may ask for a line of user text at any time.
//! The broker keeps at most one request active (rendered) and queues the
//! rest FIFO, servicing them strictly in arrival order.

use std::collections::VecDeque;

use tracing::warn;

use crate::core::events::BackendChannel;
use crate::surface::TextSurface;

/// A backend's request for one line of user text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRawInputRequest {
    pub backend_id: String,
    pub prompt: String,
    /// When false, keystrokes are buffered but never rendered
    pub echo: bool,
}

/// Serializes raw-input requests into a single active prompt.
#[derive(Debug, Default)]
pub struct RawInputBroker {
    active: Option<PendingRawInputRequest>,
    queue: VecDeque<PendingRawInputRequest>,
    pending_line: String,
}

impl RawInputBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is currently active (prompt rendered, input owned
    /// by the broker)
    pub fn is_awaiting(&self) -> bool {
        self.active.is_some()
    }

    /// Echo mode of the active request, if any
    pub fn echo(&self) -> bool {
        self.active.as_ref().map(|r| r.echo).unwrap_or(true)
    }

    /// Accept a raw-input request. Activates immediately when idle,
    /// otherwise appends to the FIFO queue without rendering.
    pub fn request(&mut self, req: PendingRawInputRequest, surface: &mut dyn TextSurface) {
        if self.active.is_some() {
            self.queue.push_back(req);
            return;
        }
        self.activate(req, surface);
    }

    fn activate(&mut self, req: PendingRawInputRequest, surface: &mut dyn TextSurface) {
        surface.insert_at_end(&format!("\n[{}] {}", req.backend_id, req.prompt));
        let line = surface.line_count().saturating_sub(1);
        surface.ensure_visible(line);
        self.pending_line.clear();
        self.active = Some(req);
    }

    /// Buffer one keystroke, rendering it only when echo is on
    pub fn push_char(&mut self, ch: char, surface: &mut dyn TextSurface) {
        if self.active.is_none() {
            return;
        }
        self.pending_line.push(ch);
        if self.echo() {
            surface.insert_at_end(&ch.to_string());
        }
    }

    /// Remove the last buffered keystroke
    pub fn backspace(&mut self, surface: &mut dyn TextSurface) {
        if self.active.is_none() || self.pending_line.pop().is_none() {
            return;
        }
        if self.echo() {
            let line = surface.line_count().saturating_sub(1);
            let len = surface.line_text(line).chars().count();
            if len > 0 {
                surface.replace_range((line, len - 1), (line, len), "");
            }
        }
    }

    /// Submit the buffered line to the active request's backend, then either
    /// activate the next queued request or fall idle. Returns true while a
    /// request remains active.
    pub fn submit(&mut self, channel: &dyn BackendChannel, surface: &mut dyn TextSurface) -> bool {
        let Some(req) = self.active.take() else {
            return false;
        };
        let line = std::mem::take(&mut self.pending_line);
        if let Err(e) = channel.send_raw_input(&req.backend_id, &line) {
            warn!("raw input reply to '{}' failed: {}", req.backend_id, e);
        }
        surface.insert_at_end("\n");

        if let Some(next) = self.queue.pop_front() {
            self.activate(next, surface);
            return true;
        }
        false
    }

    /// Drop the active request and the queue (connection loss)
    pub fn reset(&mut self) {
        self.active = None;
        self.queue.clear();
        self.pending_line.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{BackendCommand, MpscChannel};
    use crate::surface::BufferSurface;
    use std::sync::mpsc;

    fn req(backend_id: &str, prompt: &str, echo: bool) -> PendingRawInputRequest {
        PendingRawInputRequest {
            backend_id: backend_id.to_string(),
            prompt: prompt.to_string(),
            echo,
        }
    }

    #[test]
    fn test_requests_serviced_in_arrival_order() {
        let mut surface = BufferSurface::new();
        let mut broker = RawInputBroker::new();
        let (tx, rx) = mpsc::channel();
        let channel = MpscChannel::new(tx);

        broker.request(req("a", "name? ", true), &mut surface);
        broker.request(req("b", "age? ", true), &mut surface);
        broker.request(req("c", "city? ", true), &mut surface);

        // Only A's prompt is rendered so far
        let rendered = surface.text();
        assert!(rendered.contains("[a] name? "));
        assert!(!rendered.contains("[b]"));
        assert!(!rendered.contains("[c]"));

        for ch in "ada".chars() {
            broker.push_char(ch, &mut surface);
        }
        assert!(broker.submit(&channel, &mut surface));
        assert_eq!(
            rx.try_recv().unwrap(),
            BackendCommand::RawInput {
                backend_id: "a".to_string(),
                text: "ada".to_string()
            }
        );

        // B activates only after A was answered; C stays queued
        let rendered = surface.text();
        assert!(rendered.contains("[b] age? "));
        assert!(!rendered.contains("[c]"));

        assert!(broker.submit(&channel, &mut surface));
        assert!(surface.text().contains("[c] city? "));
        assert!(!broker.submit(&channel, &mut surface));
        assert!(!broker.is_awaiting());
    }

    #[test]
    fn test_no_echo_buffers_without_rendering() {
        let mut surface = BufferSurface::new();
        let mut broker = RawInputBroker::new();
        let (tx, rx) = mpsc::channel();
        let channel = MpscChannel::new(tx);

        broker.request(req("a", "password: ", false), &mut surface);
        for ch in "hunter2".chars() {
            broker.push_char(ch, &mut surface);
        }
        assert!(!surface.text().contains("hunter2"));

        broker.submit(&channel, &mut surface);
        assert_eq!(
            rx.try_recv().unwrap(),
            BackendCommand::RawInput {
                backend_id: "a".to_string(),
                text: "hunter2".to_string()
            }
        );
    }

    #[test]
    fn test_backspace_clamps_at_prompt() {
        let mut surface = BufferSurface::new();
        let mut broker = RawInputBroker::new();

        broker.request(req("a", "q? ", true), &mut surface);
        broker.push_char('x', &mut surface);
        broker.backspace(&mut surface);
        // Further backspaces must not eat the prompt
        broker.backspace(&mut surface);
        broker.backspace(&mut surface);

        assert!(surface.text().contains("[a] q? "));
    }

    #[test]
    fn test_reset_drops_queue() {
        let mut surface = BufferSurface::new();
        let mut broker = RawInputBroker::new();
        let (tx, _rx) = mpsc::channel();
        let channel = MpscChannel::new(tx);

        broker.request(req("a", "? ", true), &mut surface);
        broker.request(req("b", "? ", true), &mut surface);
        broker.reset();

        assert!(!broker.is_awaiting());
        assert!(!broker.submit(&channel, &mut surface));
    }
}
