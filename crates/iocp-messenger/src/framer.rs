//! Byte-level framing.
//!
//! The framer accumulates bytes into a fixed-capacity receive buffer until the
//! command separator is seen, then hands out the complete raw line. The buffer
//! never grows: a line that fills it before its separator arrives is dropped.

use bytes::{BufMut, Bytes, BytesMut};

use crate::telemetry::metric_defs;

/// State of inbound message processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Accumulating the bytes of one command.
    AwaitingSeparator,
    /// Separator just seen, raw line ready for dispatch.
    LineComplete,
    /// Identifier consumed, arguments are being pulled by a handler.
    TokenizingArguments,
}

/// Result of feeding one byte to the [`Framer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// More bytes are needed.
    Incomplete,
    /// A complete, non-empty raw line without its separator.
    LineReady(Bytes),
}

/// Receive buffer and command boundary detection.
#[derive(Debug)]
pub struct Framer {
    /// Bytes of the command being received.
    buffer: BytesMut,
    /// Fixed buffer capacity.
    capacity: usize,
    /// Command separator byte.
    separator: u8,
    /// Current message state.
    state: MessageState,
    /// Number of partial lines dropped on overflow.
    overflows: u64,
}

impl Framer {
    /// Create a framer with the given buffer capacity and command separator.
    ///
    /// `capacity` must be at least 2.
    pub fn new(capacity: usize, separator: u8) -> Self {
        Framer {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            separator,
            state: MessageState::AwaitingSeparator,
            overflows: 0,
        }
    }

    /// Process one byte.
    pub fn feed(&mut self, byte: u8) -> FrameEvent {
        self.state = MessageState::AwaitingSeparator;

        if byte == self.separator {
            if self.buffer.is_empty() {
                return FrameEvent::Incomplete;
            }
            let line = Bytes::copy_from_slice(&self.buffer);
            self.reset();
            self.state = MessageState::LineComplete;
            metrics::counter!(metric_defs::LINES_RECEIVED.name).increment(1);
            return FrameEvent::LineReady(line);
        }

        self.buffer.put_u8(byte);
        if self.buffer.len() >= self.capacity - 1 {
            log::trace!(
                "receive buffer full ({} bytes), dropping partial line",
                self.buffer.len()
            );
            self.overflows += 1;
            metrics::counter!(metric_defs::BUFFER_OVERFLOWS.name).increment(1);
            self.reset();
        }

        FrameEvent::Incomplete
    }

    /// Discard any partially received line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Current message state.
    pub fn state(&self) -> MessageState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: MessageState) {
        self.state = state;
    }

    /// Number of bytes of the partial line currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Receive buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of partial lines dropped because the buffer filled up.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(framer: &mut Framer, data: &[u8]) -> Vec<Bytes> {
        data.iter()
            .filter_map(|&b| match framer.feed(b) {
                FrameEvent::LineReady(line) => Some(line),
                FrameEvent::Incomplete => None,
            })
            .collect()
    }

    #[test]
    fn test_line_ready_on_separator() {
        let mut framer = Framer::new(64, b'\r');
        let lines = feed_all(&mut framer, b"Arn.Vivo:\r");
        assert_eq!(lines, vec![Bytes::from_static(b"Arn.Vivo:")]);
        assert_eq!(framer.state(), MessageState::LineComplete);
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_empty_commands_are_dropped() {
        let mut framer = Framer::new(64, b'\r');
        assert!(feed_all(&mut framer, b"\r\r\r").is_empty());
        assert_eq!(framer.state(), MessageState::AwaitingSeparator);
    }

    #[test]
    fn test_partial_line_waits() {
        let mut framer = Framer::new(64, b'\r');
        assert!(feed_all(&mut framer, b"Arn.Re").is_empty());
        assert_eq!(framer.buffered_len(), 6);

        let lines = feed_all(&mut framer, b"sp\r");
        assert_eq!(lines, vec![Bytes::from_static(b"Arn.Resp")]);
    }

    #[test]
    fn test_state_returns_to_awaiting_on_next_byte() {
        let mut framer = Framer::new(64, b'\r');
        feed_all(&mut framer, b"A\r");
        assert_eq!(framer.state(), MessageState::LineComplete);
        framer.feed(b'B');
        assert_eq!(framer.state(), MessageState::AwaitingSeparator);
    }

    #[test]
    fn test_overflow_drops_line() {
        let mut framer = Framer::new(8, b'\r');

        // 6 bytes fit (capacity - 2)
        let lines = feed_all(&mut framer, b"abcdef\r");
        assert_eq!(lines, vec![Bytes::from_static(b"abcdef")]);
        assert_eq!(framer.overflows(), 0);

        // 7 bytes reach capacity - 1 and force a reset
        assert!(feed_all(&mut framer, b"abcdefg").is_empty());
        assert_eq!(framer.overflows(), 1);
        assert_eq!(framer.buffered_len(), 0);
        assert!(feed_all(&mut framer, b"\r").is_empty());
    }

    #[test]
    fn test_overflow_does_not_corrupt_next_line() {
        let mut framer = Framer::new(8, b'\r');
        feed_all(&mut framer, b"0123456");
        let lines = feed_all(&mut framer, b"\rok\r");
        assert_eq!(lines, vec![Bytes::from_static(b"ok")]);
    }

    #[test]
    fn test_overflow_tail_becomes_new_line() {
        let mut framer = Framer::new(8, b'\r');
        let lines = feed_all(&mut framer, b"0123456789\r");
        assert_eq!(lines, vec![Bytes::from_static(b"789")]);
    }

    #[test]
    fn test_buffer_never_grows() {
        let mut framer = Framer::new(16, b'\r');
        feed_all(&mut framer, &[b'x'; 1000]);
        assert!(framer.buffered_len() < framer.capacity());
    }
}
