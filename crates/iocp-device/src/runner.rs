//! Device main loop.
//!
//! The loop is cooperative: each iteration feeds whatever the link has
//! received into the messenger, then applies the updates the handlers queued.
//! The link itself is a TCP connection standing in for the serial port.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use iocp_messenger::{Messenger, StreamTransport, Transport};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::DeviceResult;
use crate::handlers::{apply_updates, attach_command_callbacks, DeviceState};

/// A device bound to one link.
pub struct Device<T> {
    messenger: Messenger<T, DeviceState>,
    state: DeviceState,
}

impl<T: Transport + 'static> Device<T> {
    /// Build the messenger over `transport` and register the handlers.
    pub fn new(transport: T, config: &DeviceConfig) -> DeviceResult<Self> {
        let mut messenger = Messenger::new(transport, config.messenger.clone())?;
        attach_command_callbacks(&mut messenger, config.debug)?;
        Ok(Device {
            messenger,
            state: DeviceState::new(config.update_capacity, config.debug),
        })
    }

    /// Run one loop iteration. Returns the number of commands dispatched.
    ///
    /// Updates queued before a transport error are still applied.
    pub fn poll(&mut self) -> DeviceResult<usize> {
        let fed = self.messenger.feed_in_serial_data(&mut self.state);
        apply_updates(&mut self.state);
        Ok(fed?)
    }

    /// The messenger driving the link.
    pub fn messenger(&self) -> &Messenger<T, DeviceState> {
        &self.messenger
    }

    /// Mutable access to the messenger.
    pub fn messenger_mut(&mut self) -> &mut Messenger<T, DeviceState> {
        &mut self.messenger
    }

    /// The application state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }
}

/// Accept host connections and serve them one at a time until `shutdown`.
pub fn serve(config: &DeviceConfig, shutdown: &AtomicBool) -> DeviceResult<()> {
    let listener = TcpListener::bind(config.listen)?;
    info!("Listening for IOCP host on {}", listener.local_addr()?);

    serve_listener(listener, config, shutdown)
}

/// Serve host connections on an already bound listener.
///
/// A failed session is logged and the next host is accepted.
pub fn serve_listener(
    listener: TcpListener,
    config: &DeviceConfig,
    shutdown: &AtomicBool,
) -> DeviceResult<()> {
    listener.set_nonblocking(true)?;
    let interval = Duration::from_millis(config.poll_interval_ms);

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("Host connected from {}", peer);
                match run_session(stream, config, shutdown) {
                    Ok(()) => info!("Host {} disconnected", peer),
                    Err(e) => warn!("Session with {} failed: {}", peer, e),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => thread::sleep(interval),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Drive one host connection until it closes or `shutdown` is set.
fn run_session(stream: TcpStream, config: &DeviceConfig, shutdown: &AtomicBool) -> DeviceResult<()> {
    stream.set_nonblocking(true)?;
    stream.set_nodelay(true)?;

    let interval = Duration::from_millis(config.poll_interval_ms);
    let transport = StreamTransport::new(stream)
        .with_write_timeout(Duration::from_millis(config.write_timeout_ms));
    let mut device = match Device::new(transport, config) {
        Ok(device) => device,
        Err(e) if e.is_disconnect() => return Ok(()),
        Err(e) => return Err(e),
    };

    while !shutdown.load(Ordering::Relaxed) {
        match device.poll() {
            Ok(_) => {}
            Err(e) if e.is_disconnect() => {
                debug!("Session ended: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        thread::sleep(interval);
    }
    Ok(())
}
