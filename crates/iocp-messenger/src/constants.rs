//! Protocol constants
//!
//! Defaults for the wire format and the fixed resource bounds of the
//! messenger. All of them can be overridden through [`MessengerConfig`].
//!
//! [`MessengerConfig`]: crate::MessengerConfig

// ============================================================================
// Wire Format
// ============================================================================

/// Prefix marking a line as an IOCP command.
pub const DEFAULT_IDENTIFIER: &str = "Arn.";

/// Characters that delimit arguments. The first one is used when sending.
pub const DEFAULT_FIELD_SEPARATORS: &str = ":\r";

/// Character terminating a complete command.
pub const DEFAULT_COMMAND_SEPARATOR: char = '\r';

/// Line terminator appended after an outgoing command when enabled.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

// ============================================================================
// Resource Bounds
// ============================================================================

/// Capacity of the receive buffer. A line reaching `capacity - 1` bytes
/// before its separator is dropped.
pub const MESSENGER_BUFFER_SIZE: usize = 64;

/// Maximum number of bytes pulled from the transport in one read.
pub const MAX_STREAM_BUFFER_SIZE: usize = 64;

/// Maximum number of command handler registrations.
pub const MAX_CALLBACKS: usize = 30;
