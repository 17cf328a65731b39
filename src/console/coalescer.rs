//! Output coalescing
//!
//! Backend output arrives as many small fragments. The coalescer buffers
//! them and flushes the whole batch as one atomic insert per event-loop
//! tick, preserving arrival order exactly.

use crate::surface::TextSurface;

/// Accumulates output fragments between flushes.
#[derive(Debug, Default)]
pub struct OutputCoalescer {
    buffer: String,
    flush_scheduled: bool,
}

impl OutputCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns true if this call scheduled the flush for
    /// the current tick (at most one flush is ever scheduled).
    pub fn enqueue(&mut self, text: &str) -> bool {
        self.buffer.push_str(text);
        if self.flush_scheduled {
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    pub fn flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// Insert the accumulated buffer at the end of the surface in a single
    /// call, then reset.
    ///
    /// After the insert, the cursor is nudged one column left and back
    /// again. The host display relies on this to keep its internal cursor
    /// bookkeeping consistent; it is part of the post-flush contract and
    /// must not be removed.
    pub fn flush(&mut self, surface: &mut dyn TextSurface) {
        if !self.flush_scheduled {
            return;
        }
        self.flush_scheduled = false;
        if self.buffer.is_empty() {
            return;
        }

        let text = std::mem::take(&mut self.buffer);
        surface.insert_at_end(&text);

        let (line, col) = surface.cursor_position();
        surface.set_cursor_position(line, col.saturating_sub(1));
        surface.set_cursor_position(line, col);
        surface.ensure_visible(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BufferSurface;

    #[test]
    fn test_fragments_flush_as_single_insert() {
        let mut surface = BufferSurface::new();
        let mut coalescer = OutputCoalescer::new();

        assert!(coalescer.enqueue("foo"));
        assert!(!coalescer.enqueue("bar"));
        assert!(!coalescer.enqueue("baz"));

        coalescer.flush(&mut surface);
        assert_eq!(surface.inserts, vec!["foobarbaz".to_string()]);
    }

    #[test]
    fn test_flush_resets_buffer() {
        let mut surface = BufferSurface::new();
        let mut coalescer = OutputCoalescer::new();

        coalescer.enqueue("one");
        coalescer.flush(&mut surface);
        assert!(!coalescer.flush_scheduled());

        // A later fragment schedules a fresh flush
        assert!(coalescer.enqueue("two"));
        coalescer.flush(&mut surface);
        assert_eq!(surface.inserts, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_flush_without_enqueue_is_noop() {
        let mut surface = BufferSurface::new();
        let mut coalescer = OutputCoalescer::new();
        coalescer.flush(&mut surface);
        assert!(surface.inserts.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let mut surface = BufferSurface::new();
        let mut coalescer = OutputCoalescer::new();
        for fragment in ["1", "2", "3", "4", "5"] {
            coalescer.enqueue(fragment);
        }
        coalescer.flush(&mut surface);
        assert_eq!(surface.inserts, vec!["12345".to_string()]);
    }
}
