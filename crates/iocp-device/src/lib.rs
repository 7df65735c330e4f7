//! IOCP Device
//!
//! The device side of the IOCP link. It answers keep-alive probes from the
//! host, collects position/value updates sent with `Resp` commands and applies
//! them once per loop iteration.
//!
//! # Commands
//!
//! - `Vivo` (host → device): keep-alive; the device answers with `Vivo`
//! - `Resp` (host → device): arguments of the form `<position>=<value>`
//! - `Stat` (device → host): diagnostic text, sent in debug mode only
//!
//! The serial link is served over TCP so a host can connect with any socket
//! client, the same way a simulated UART would be exposed.

mod config;
mod error;
mod handlers;
mod runner;
mod updates;

pub use config::*;
pub use error::*;
pub use handlers::*;
pub use runner::*;
pub use updates::*;
