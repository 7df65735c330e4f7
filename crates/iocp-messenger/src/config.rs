//! Messenger configuration.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{MessengerError, MessengerResult};

/// Wire format and resource bounds of a messenger.
///
/// The configuration is fixed once the messenger is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Prefix every command starts with (e.g. `Arn.`).
    pub identifier: String,
    /// Set of characters delimiting arguments. The first one is used when sending.
    pub field_separators: String,
    /// Character terminating a command.
    pub command_separator: char,
    /// Append `\r\n` after each outgoing command.
    pub line_terminator: bool,
    /// Receive buffer capacity in bytes.
    pub buffer_capacity: usize,
    /// Maximum bytes pulled from the transport per read.
    pub stream_chunk_size: usize,
    /// Maximum number of command handler registrations.
    pub max_handlers: usize,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        MessengerConfig {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            field_separators: DEFAULT_FIELD_SEPARATORS.to_string(),
            command_separator: DEFAULT_COMMAND_SEPARATOR,
            line_terminator: true,
            buffer_capacity: MESSENGER_BUFFER_SIZE,
            stream_chunk_size: MAX_STREAM_BUFFER_SIZE,
            max_handlers: MAX_CALLBACKS,
        }
    }
}

impl MessengerConfig {
    /// Set the identifier prefix.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Set the field separator characters.
    pub fn with_field_separators(mut self, separators: impl Into<String>) -> Self {
        self.field_separators = separators.into();
        self
    }

    /// Set the command separator character.
    pub fn with_command_separator(mut self, separator: char) -> Self {
        self.command_separator = separator;
        self
    }

    /// Enable or disable the trailing `\r\n` on outgoing commands.
    pub fn with_line_terminator(mut self, enabled: bool) -> Self {
        self.line_terminator = enabled;
        self
    }

    /// Set the receive buffer capacity.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the transport read chunk size.
    pub fn with_stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size;
        self
    }

    /// Set the maximum number of handler registrations.
    pub fn with_max_handlers(mut self, max: usize) -> Self {
        self.max_handlers = max;
        self
    }

    /// Check that the configuration describes a usable wire format.
    pub fn validate(&self) -> MessengerResult<()> {
        if self.field_separators.is_empty() {
            return Err(invalid("field separator set is empty"));
        }
        if !self.field_separators.is_ascii() {
            return Err(invalid("field separators must be ASCII"));
        }
        if !self.command_separator.is_ascii() {
            return Err(invalid("command separator must be ASCII"));
        }
        if self.identifier.contains(self.command_separator) {
            return Err(invalid("identifier contains the command separator"));
        }
        if self.buffer_capacity < 2 {
            return Err(MessengerError::InvalidConfig(format!(
                "buffer capacity must be at least 2, got {}",
                self.buffer_capacity
            )));
        }
        if self.stream_chunk_size == 0 {
            return Err(invalid("stream chunk size must be non-zero"));
        }
        if self.max_handlers == 0 {
            return Err(invalid("max handlers must be non-zero"));
        }
        Ok(())
    }

    /// The command separator as a wire byte.
    ///
    /// Only meaningful on a validated configuration.
    pub(crate) fn command_separator_byte(&self) -> u8 {
        self.command_separator as u8
    }
}

fn invalid(reason: &str) -> MessengerError {
    MessengerError::InvalidConfig(reason.to_string())
}
