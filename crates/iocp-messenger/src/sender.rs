//! Outgoing command builder.
//!
//! At most one outgoing command is open at a time. While it is open the
//! messenger stops feeding inbound bytes to the framer, so a handler cannot
//! interleave a second command with the one being written.

use std::fmt::{self, Write as _};
use std::io;

use bytes::{BufMut, BytesMut};

use crate::config::MessengerConfig;
use crate::constants::LINE_TERMINATOR;
use crate::error::MessengerResult;
use crate::telemetry::metric_defs;
use crate::transport::Transport;

/// Writes identifier-prefixed commands to the transport.
#[derive(Debug)]
pub struct Sender<T> {
    transport: T,
    /// Identifier prefix written before every command.
    identifier: String,
    /// Separator written before each argument and at the end.
    field_separator: u8,
    /// Append `\r\n` after each command.
    line_terminator: bool,
    /// Whether a command is being built.
    in_progress: bool,
    /// Staging buffer for a single write.
    scratch: BytesMut,
    /// Number of commands completed.
    sent: u64,
}

impl<T: Transport> Sender<T> {
    /// Create a sender writing to `transport` in the configured wire format.
    pub fn new(transport: T, config: &MessengerConfig) -> Self {
        Sender {
            transport,
            identifier: config.identifier.clone(),
            field_separator: config.field_separators.as_bytes().first().copied().unwrap_or(b':'),
            line_terminator: config.line_terminator,
            in_progress: false,
            scratch: BytesMut::with_capacity(64),
            sent: 0,
        }
    }

    /// Start a command. Ignored if a command is already open.
    pub fn begin(&mut self, command_id: &str) -> MessengerResult<()> {
        if self.in_progress {
            log::debug!("outgoing command already open, ignoring start of '{}'", command_id);
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(self.identifier.as_bytes());
        self.scratch.extend_from_slice(command_id.as_bytes());
        self.transport.write(&self.scratch)?;
        self.in_progress = true;
        Ok(())
    }

    /// Append an argument to the open command. Ignored if none is open.
    ///
    /// The value is written using its `Display` form and must not contain
    /// separator characters.
    pub fn append_argument<A: fmt::Display>(&mut self, arg: A) -> MessengerResult<()> {
        if !self.in_progress {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.put_u8(self.field_separator);
        write!(self.scratch, "{}", arg)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "argument formatting failed"))?;
        self.transport.write(&self.scratch)?;
        Ok(())
    }

    /// Finish the open command. A no-op if none is open.
    pub fn end(&mut self) -> MessengerResult<()> {
        if !self.in_progress {
            return Ok(());
        }
        self.in_progress = false;

        self.scratch.clear();
        self.scratch.put_u8(self.field_separator);
        if self.line_terminator {
            self.scratch.extend_from_slice(LINE_TERMINATOR);
        }
        self.transport.write(&self.scratch)?;

        self.sent += 1;
        metrics::counter!(metric_defs::COMMANDS_SENT.name).increment(1);
        Ok(())
    }

    /// Send a complete command with one argument.
    ///
    /// Returns `false` without writing anything if a command is already open.
    pub fn send_cmd<A: fmt::Display>(&mut self, command_id: &str, arg: A) -> MessengerResult<bool> {
        self.send_cmd_args(command_id, std::iter::once(arg))
    }

    /// Send a complete command with any number of arguments.
    ///
    /// Returns `false` without writing anything if a command is already open.
    pub fn send_cmd_args<I>(&mut self, command_id: &str, args: I) -> MessengerResult<bool>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        if self.in_progress {
            return Ok(false);
        }
        self.begin(command_id)?;
        for arg in args {
            self.append_argument(arg)?;
        }
        self.end()?;
        Ok(true)
    }

    /// Whether a command is being built.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Number of commands completed.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn sender(line_terminator: bool) -> Sender<MemoryTransport> {
        let config = MessengerConfig::default().with_line_terminator(line_terminator);
        Sender::new(MemoryTransport::new(), &config)
    }

    #[test]
    fn test_begin_append_end() {
        let mut tx = sender(false);
        tx.begin("Stat").unwrap();
        tx.append_argument("hello").unwrap();
        tx.append_argument(42).unwrap();
        tx.end().unwrap();

        assert_eq!(tx.transport().written(), b"Arn.Stat:hello:42:");
        assert_eq!(tx.sent_count(), 1);
    }

    #[test]
    fn test_line_terminator() {
        let mut tx = sender(true);
        tx.begin("Vivo").unwrap();
        tx.end().unwrap();
        assert_eq!(tx.transport().written(), b"Arn.Vivo:\r\n");
    }

    #[test]
    fn test_second_begin_is_ignored() {
        let mut tx = sender(false);
        tx.begin("One").unwrap();
        tx.begin("Two").unwrap();
        assert!(tx.is_in_progress());
        assert_eq!(tx.transport().written(), b"Arn.One");

        tx.append_argument("x").unwrap();
        tx.end().unwrap();
        assert_eq!(tx.transport().written(), b"Arn.One:x:");
    }

    #[test]
    fn test_end_twice_is_noop() {
        let mut tx = sender(true);
        tx.begin("Vivo").unwrap();
        tx.end().unwrap();
        let written = tx.transport().written().len();

        tx.end().unwrap();
        assert_eq!(tx.transport().written().len(), written);
        assert!(!tx.is_in_progress());
        assert_eq!(tx.sent_count(), 1);
    }

    #[test]
    fn test_append_without_begin_is_noop() {
        let mut tx = sender(false);
        tx.append_argument("lost").unwrap();
        assert!(tx.transport().written().is_empty());
    }

    #[test]
    fn test_send_cmd_fails_while_open() {
        let mut tx = sender(false);
        assert!(tx.send_cmd("Stat", "ok").unwrap());
        assert_eq!(tx.transport_mut().take_written().as_ref(), b"Arn.Stat:ok:");

        tx.begin("Open").unwrap();
        assert!(!tx.send_cmd("Stat", "dropped").unwrap());
        assert_eq!(tx.transport().written(), b"Arn.Open");
        assert!(tx.is_in_progress());
    }

    #[test]
    fn test_send_cmd_args() {
        let mut tx = sender(false);
        assert!(tx.send_cmd_args("Resp", ["1=100", "2=200"]).unwrap());
        assert_eq!(tx.transport().written(), b"Arn.Resp:1=100:2=200:");
    }

    #[test]
    fn test_custom_wire_format() {
        let config = MessengerConfig::default()
            .with_identifier("IO/")
            .with_field_separators(",;")
            .with_line_terminator(false);
        let mut tx = Sender::new(MemoryTransport::new(), &config);
        tx.send_cmd("Pos", -3).unwrap();
        assert_eq!(tx.transport().written(), b"IO/Pos,-3,");
    }
}
