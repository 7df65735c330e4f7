//! IOCP Serial Messenger
//!
//! This crate implements the line-oriented command protocol spoken between an
//! IOCP device and its host over a serial link. It incrementally consumes raw
//! bytes, recognizes complete commands, splits them into an identifier and
//! ordered arguments, and dispatches registered handlers. The same wire format
//! is used to compose outgoing commands.
//!
//! # Protocol Overview
//!
//! Every command is a single line of text:
//!
//! ```text
//! <identifier><command-id><field-sep><arg1><field-sep><arg2>...<field-sep><command-sep>
//! ```
//!
//! - **Identifier**: fixed prefix shared by both directions (default `Arn.`)
//! - **Field separators**: any one of a set of characters (default `:` and `\r`)
//! - **Command separator**: a single character ending the command (default `\r`)
//!
//! There is no escaping: argument values must not contain separator characters.
//!
//! # Example
//!
//! ```rust
//! use iocp_messenger::{Messenger, MessengerConfig, MemoryTransport};
//!
//! let mut messenger: Messenger<MemoryTransport, Vec<String>> =
//!     Messenger::new(MemoryTransport::new(), MessengerConfig::default()).unwrap();
//!
//! messenger.attach("Resp", |cmd, seen: &mut Vec<String>| {
//!     while let Some(arg) = cmd.next_arg() {
//!         seen.push(arg.to_string_lossy().into_owned());
//!     }
//! });
//!
//! messenger.transport_mut().push_rx(b"Arn.Resp:1=100:2=200\r");
//!
//! let mut seen = Vec::new();
//! messenger.feed_in_serial_data(&mut seen).unwrap();
//! assert_eq!(seen, vec!["1=100", "2=200"]);
//! ```

mod config;
mod constants;
mod error;
mod framer;
mod messenger;
pub mod telemetry;
mod registry;
mod sender;
mod tokenizer;
mod transport;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use framer::*;
pub use messenger::*;
pub use registry::*;
pub use sender::*;
pub use tokenizer::*;
pub use transport::*;
