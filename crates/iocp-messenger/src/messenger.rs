//! The messenger: framing, dispatch and sending over one transport.
//!
//! The messenger is driven cooperatively by the caller's loop. Each call to
//! [`Messenger::feed_in_serial_data`] drains the bytes currently available on
//! the transport, frames them into lines and runs the matching handlers
//! synchronously. Handlers receive a [`Command`] to pull arguments from and to
//! send replies with, plus the application state `S` passed by the caller.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BytesMut};

use crate::config::MessengerConfig;
use crate::error::MessengerResult;
use crate::framer::{FrameEvent, Framer, MessageState};
use crate::registry::{DispatchResult, Registry};
use crate::sender::Sender;
use crate::telemetry::metric_defs;
use crate::tokenizer::{is_valid_command, split_command, Token, Tokenizer};
use crate::transport::Transport;

/// A boxed command handler.
pub type Handler<T, S> = Box<dyn FnMut(&mut Command<'_, T>, &mut S)>;

/// Counters describing what the messenger has seen and done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessengerStats {
    /// Complete lines produced by the framer.
    pub lines_received: u64,
    /// Partial lines dropped on receive buffer overflow.
    pub overflows: u64,
    /// Lines dropped for a missing identifier prefix.
    pub invalid_prefix: u64,
    /// Commands that matched at least one registered handler.
    pub dispatched: u64,
    /// Commands handled by the default handler.
    pub defaulted: u64,
    /// Commands with no matching or default handler.
    pub unhandled: u64,
    /// Outgoing commands completed.
    pub commands_sent: u64,
}

/// A received command, as seen by a handler.
///
/// Arguments are pulled lazily and in order. Each handler gets its own cursor
/// starting at the first argument.
pub struct Command<'a, T> {
    prefix: &'a str,
    command: &'a str,
    args: Tokenizer<'a>,
    sender: &'a mut Sender<T>,
}

impl<'a, T: Transport> Command<'a, T> {
    /// The command identifier, without the identifier prefix.
    pub fn command(&self) -> &'a str {
        self.command
    }

    /// The identifier prefix the command arrived with.
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }

    /// The full first token of the line: prefix followed by the identifier.
    pub fn full_command(&self) -> String {
        format!("{}{}", self.prefix, self.command)
    }

    /// Whether another argument is pending.
    pub fn has_arg(&self) -> bool {
        self.args.has_next()
    }

    /// Consume the next argument.
    pub fn next_arg(&mut self) -> Option<Token<'a>> {
        self.args.next_token()
    }

    /// Consume the next argument and parse it.
    ///
    /// Returns `None` if there is no argument or it does not parse; the
    /// argument is consumed either way.
    pub fn next_arg_as<V: FromStr>(&mut self) -> Option<V> {
        self.next_arg()?.parse()
    }

    /// The remaining arguments.
    pub fn args(&mut self) -> &mut Tokenizer<'a> {
        &mut self.args
    }

    /// The outgoing command builder, for replies.
    pub fn sender(&mut self) -> &mut Sender<T> {
        self.sender
    }
}

impl<T> fmt::Debug for Command<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("command", &self.command)
            .field("remaining", &String::from_utf8_lossy(self.args.remainder()))
            .finish()
    }
}

/// Line-oriented command protocol engine over a [`Transport`].
///
/// `S` is the application state handed to every handler.
pub struct Messenger<T, S = ()> {
    config: MessengerConfig,
    framer: Framer,
    registry: Registry<Handler<T, S>>,
    sender: Sender<T>,
    /// Bytes read from the transport but not yet framed.
    stream: BytesMut,
    /// Read buffer, `stream_chunk_size` bytes.
    chunk: Vec<u8>,
    /// Identifier of the last dispatched command.
    last_command: String,
    stats: MessengerStats,
}

impl<T: Transport, S> Messenger<T, S> {
    /// Create a messenger over `transport`.
    pub fn new(transport: T, config: MessengerConfig) -> MessengerResult<Self> {
        config.validate()?;

        Ok(Messenger {
            framer: Framer::new(config.buffer_capacity, config.command_separator_byte()),
            registry: Registry::new(config.max_handlers),
            sender: Sender::new(transport, &config),
            stream: BytesMut::with_capacity(config.stream_chunk_size),
            chunk: vec![0u8; config.stream_chunk_size],
            last_command: String::new(),
            stats: MessengerStats::default(),
            config,
        })
    }

    // ========== Registration ==========

    /// Attach the handler run for commands no registration matches.
    pub fn attach_default<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Command<'_, T>, &mut S) + 'static,
    {
        self.registry.register_default(Box::new(handler));
    }

    /// Attach a handler for `command`.
    ///
    /// Several handlers may be attached to the same identifier; all of them
    /// run, in attachment order.
    pub fn attach<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: FnMut(&mut Command<'_, T>, &mut S) + 'static,
    {
        self.registry.register(command, Box::new(handler));
    }

    // ========== Inbound ==========

    /// Drain available transport bytes, dispatching every complete command.
    ///
    /// Processing stops early while an outgoing command is open; bytes
    /// already read are kept and framed on a later call. Returns the number
    /// of commands dispatched (including default-handler dispatches).
    pub fn feed_in_serial_data(&mut self, state: &mut S) -> MessengerResult<usize> {
        let mut dispatched = 0;

        loop {
            while !self.sender.is_in_progress() && !self.stream.is_empty() {
                let byte = self.stream.get_u8();
                if let FrameEvent::LineReady(line) = self.framer.feed(byte) {
                    self.stats.lines_received += 1;
                    match self.handle_line(&line, state) {
                        Some(DispatchResult::Matched(_)) | Some(DispatchResult::Default) => {
                            dispatched += 1
                        }
                        _ => {}
                    }
                }
            }

            if self.sender.is_in_progress() {
                break;
            }

            let transport = self.sender.transport_mut();
            let available = transport.available()?;
            if available == 0 {
                break;
            }
            let want = available.min(self.chunk.len());
            let read = transport.read(&mut self.chunk[..want])?;
            if read == 0 {
                break;
            }
            self.stream.extend_from_slice(&self.chunk[..read]);
        }

        Ok(dispatched)
    }

    /// Validate, tokenize and dispatch one raw line.
    fn handle_line(&mut self, line: &[u8], state: &mut S) -> Option<DispatchResult> {
        let identifier = self.config.identifier.as_bytes();
        let separators = self.config.field_separators.as_bytes();

        if !is_valid_command(line, identifier) {
            log::trace!(
                "dropping line without identifier prefix: {:?}",
                String::from_utf8_lossy(line)
            );
            self.stats.invalid_prefix += 1;
            metrics::counter!(metric_defs::INVALID_PREFIX.name).increment(1);
            return None;
        }

        let (command, args) = split_command(line, identifier, separators)?;
        let args = args.remainder();

        self.last_command.clear();
        self.last_command.push_str(&command.to_string_lossy());
        self.framer.set_state(MessageState::TokenizingArguments);

        let prefix = self.config.identifier.as_str();
        let name = self.last_command.as_str();
        let sender = &mut self.sender;
        let result = self.registry.dispatch(command.as_bytes(), |handler| {
            let mut cmd = Command {
                prefix,
                command: name,
                args: Tokenizer::new(args, separators),
                sender: &mut *sender,
            };
            handler(&mut cmd, &mut *state);
        });

        match result {
            DispatchResult::Matched(n) => {
                log::debug!("dispatched '{}' to {} handler(s)", name, n);
                self.stats.dispatched += 1;
                metrics::counter!(metric_defs::COMMANDS_DISPATCHED.name).increment(1);
            }
            DispatchResult::Default => {
                log::debug!("no handler for '{}', ran default handler", name);
                self.stats.defaulted += 1;
                metrics::counter!(metric_defs::COMMANDS_DEFAULTED.name).increment(1);
            }
            DispatchResult::Unhandled => {
                log::debug!("no handler for '{}', ignoring", name);
                self.stats.unhandled += 1;
                metrics::counter!(metric_defs::COMMANDS_UNHANDLED.name).increment(1);
            }
        }

        Some(result)
    }

    /// Identifier of the last dispatched command (empty before the first).
    pub fn last_command(&self) -> &str {
        &self.last_command
    }

    /// Current inbound message state.
    pub fn message_state(&self) -> MessageState {
        self.framer.state()
    }

    // ========== Outbound ==========

    /// Start an outgoing command. Ignored if one is already open.
    pub fn send_cmd_start(&mut self, command_id: &str) -> MessengerResult<()> {
        self.sender.begin(command_id)
    }

    /// Append an argument to the open outgoing command.
    pub fn send_cmd_arg<A: fmt::Display>(&mut self, arg: A) -> MessengerResult<()> {
        self.sender.append_argument(arg)
    }

    /// Finish the open outgoing command and resume inbound processing.
    pub fn send_cmd_end(&mut self) -> MessengerResult<()> {
        self.sender.end()
    }

    /// Send a complete command with one argument.
    ///
    /// Returns `false` if an outgoing command is already open.
    pub fn send_cmd<A: fmt::Display>(&mut self, command_id: &str, arg: A) -> MessengerResult<bool> {
        self.sender.send_cmd(command_id, arg)
    }

    /// Whether an outgoing command is open (inbound processing paused).
    pub fn is_sending(&self) -> bool {
        self.sender.is_in_progress()
    }

    // ========== Accessors ==========

    /// The configuration this messenger was built with.
    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// Snapshot of the messenger counters.
    pub fn stats(&self) -> MessengerStats {
        MessengerStats {
            overflows: self.framer.overflows(),
            commands_sent: self.sender.sent_count(),
            ..self.stats
        }
    }

    /// Registered command identifiers, in attachment order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.registry.commands()
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        self.sender.transport()
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.sender.transport_mut()
    }

    /// Unwrap the transport.
    pub fn into_transport(self) -> T {
        self.sender.into_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    type Log = Vec<String>;

    fn messenger() -> Messenger<MemoryTransport, Log> {
        Messenger::new(MemoryTransport::new(), MessengerConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MessengerConfig::default().with_field_separators("");
        let result: MessengerResult<Messenger<MemoryTransport>> =
            Messenger::new(MemoryTransport::new(), config);
        assert!(result.is_err());
    }

    #[test]
    fn test_dispatch_with_arguments() {
        let mut m = messenger();
        m.attach("Resp", |cmd, log: &mut Log| {
            log.push(cmd.command().to_string());
            while let Some(arg) = cmd.next_arg() {
                log.push(arg.to_string());
            }
        });

        m.transport_mut().push_rx(b"Arn.Resp:1=100:2=200\r");
        let mut log = Vec::new();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 1);
        assert_eq!(log, vec!["Resp", "1=100", "2=200"]);
        assert_eq!(m.last_command(), "Resp");
        assert_eq!(m.message_state(), MessageState::TokenizingArguments);
    }

    #[test]
    fn test_invalid_prefix_not_dispatched() {
        let mut m = messenger();
        m.attach_default(|cmd, log: &mut Log| log.push(format!("default:{}", cmd.command())));

        m.transport_mut().push_rx(b"Foo.Resp:1\r");
        let mut log = Vec::new();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 0);
        assert!(log.is_empty());
        assert_eq!(m.stats().invalid_prefix, 1);
    }

    #[test]
    fn test_default_handler_receives_identifier() {
        let mut m = messenger();
        m.attach("Vivo", |_, log: &mut Log| log.push("vivo".into()));
        m.attach_default(|cmd, log: &mut Log| log.push(format!("default:{}", cmd.command())));

        m.transport_mut().push_rx(b"Arn.Xyz:\r");
        let mut log = Vec::new();
        m.feed_in_serial_data(&mut log).unwrap();
        assert_eq!(log, vec!["default:Xyz"]);
        assert_eq!(m.last_command(), "Xyz");
        assert_eq!(m.stats().defaulted, 1);
    }

    #[test]
    fn test_unhandled_without_default() {
        let mut m = messenger();
        m.transport_mut().push_rx(b"Arn.Xyz:\r");
        let mut log = Vec::new();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 0);
        assert_eq!(m.stats().unhandled, 1);
    }

    #[test]
    fn test_each_handler_sees_all_arguments() {
        let mut m = messenger();
        m.attach("Vivo", |cmd, log: &mut Log| {
            log.push(format!("a:{}", cmd.next_arg().unwrap()));
        });
        m.attach("Vivo", |cmd, log: &mut Log| {
            log.push(format!("b:{}", cmd.next_arg().unwrap()));
        });

        m.transport_mut().push_rx(b"Arn.Vivo:x\r");
        let mut log = Vec::new();
        m.feed_in_serial_data(&mut log).unwrap();
        assert_eq!(log, vec!["a:x", "b:x"]);
    }

    #[test]
    fn test_handler_reply() {
        let mut m: Messenger<MemoryTransport> =
            Messenger::new(MemoryTransport::new(), MessengerConfig::default()).unwrap();
        m.attach("Vivo", |cmd, _| {
            let tx = cmd.sender();
            tx.begin("Vivo").unwrap();
            tx.end().unwrap();
        });

        m.transport_mut().push_rx(b"Arn.Vivo:\r");
        m.feed_in_serial_data(&mut ()).unwrap();
        assert_eq!(m.transport().written(), b"Arn.Vivo:\r\n");
        assert_eq!(m.stats().commands_sent, 1);
    }

    #[test]
    fn test_open_send_defers_inbound() {
        let mut m = messenger();
        m.attach("Vivo", |_, log: &mut Log| log.push("vivo".into()));

        m.send_cmd_start("Stat").unwrap();
        m.transport_mut().push_rx(b"Arn.Vivo:\r");

        let mut log = Vec::new();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 0);
        assert!(log.is_empty());
        assert_eq!(m.transport().pending_rx(), 10);

        m.send_cmd_end().unwrap();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 1);
        assert_eq!(log, vec!["vivo"]);
    }

    #[test]
    fn test_handler_left_open_pauses_rest_of_chunk() {
        let mut m = messenger();
        m.attach("Open", |cmd, _: &mut Log| {
            cmd.sender().begin("Stat").unwrap();
        });
        m.attach("Vivo", |_, log: &mut Log| log.push("vivo".into()));

        m.transport_mut().push_rx(b"Arn.Open:\rArn.Vivo:\r");
        let mut log = Vec::new();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 1);
        assert!(log.is_empty());
        assert!(m.is_sending());

        m.send_cmd_end().unwrap();
        assert_eq!(m.feed_in_serial_data(&mut log).unwrap(), 1);
        assert_eq!(log, vec!["vivo"]);
    }

    #[test]
    fn test_has_arg_tracks_remaining_arguments() {
        let mut m = messenger();
        m.attach("Resp", |cmd, log: &mut Log| {
            while cmd.has_arg() {
                let arg = cmd.next_arg().unwrap();
                log.push(format!("{}:{}", arg, cmd.has_arg()));
            }
            log.push(format!("end:{}", cmd.has_arg()));
            assert!(cmd.next_arg().is_none());
        });
        m.attach("Vivo", |cmd, log: &mut Log| {
            log.push(format!("vivo:{}", cmd.has_arg()));
        });

        m.transport_mut().push_rx(b"Arn.Resp:a::b:\rArn.Vivo:\r");
        let mut log = Vec::new();
        m.feed_in_serial_data(&mut log).unwrap();
        assert_eq!(log, vec!["a:true", "b:false", "end:false", "vivo:false"]);
    }

    #[test]
    fn test_full_command_includes_prefix() {
        let mut m = messenger();
        m.attach_default(|cmd, log: &mut Log| {
            log.push(format!("{} {}", cmd.prefix(), cmd.full_command()));
        });

        m.transport_mut().push_rx(b"Arn.Xyz:1\r");
        let mut log = Vec::new();
        m.feed_in_serial_data(&mut log).unwrap();
        assert_eq!(log, vec!["Arn. Arn.Xyz"]);
    }

    #[test]
    fn test_next_arg_as() {
        let mut m = messenger();
        m.attach("Pos", |cmd, log: &mut Log| {
            let a: Option<i64> = cmd.next_arg_as();
            let b: Option<i64> = cmd.next_arg_as();
            let c: Option<i64> = cmd.next_arg_as();
            log.push(format!("{:?} {:?} {:?}", a, b, c));
        });

        m.transport_mut().push_rx(b"Arn.Pos:12:abc\r");
        let mut log = Vec::new();
        m.feed_in_serial_data(&mut log).unwrap();
        assert_eq!(log, vec!["Some(12) None None"]);
    }

    #[test]
    fn test_commands_listing() {
        let mut m = messenger();
        m.attach("Vivo", |_, _: &mut Log| {});
        m.attach("Resp", |_, _: &mut Log| {});
        assert_eq!(m.commands().collect::<Vec<_>>(), vec!["Vivo", "Resp"]);
    }
}
