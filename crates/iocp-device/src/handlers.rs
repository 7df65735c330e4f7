//! Command handlers of the device.

use iocp_messenger::{Command, Messenger, MessengerResult, Transport};
use tracing::{debug, info, warn};

use crate::updates::{UpdateEntry, UpdateLog};

/// Keep-alive probe, answered with the same command.
pub const CMD_KEEP_ALIVE: &str = "Vivo";
/// Position/value updates from the host.
pub const CMD_UPDATE: &str = "Resp";
/// Diagnostic text sent to the host in debug mode.
pub const CMD_STATUS: &str = "Stat";

/// Application state shared by all handlers.
#[derive(Debug)]
pub struct DeviceState {
    /// Updates waiting to be applied.
    pub updates: UpdateLog,
    /// Send `Stat` diagnostics to the host.
    pub debug: bool,
    /// Updates dropped because the log was full.
    pub rejected_updates: u64,
}

impl DeviceState {
    /// Create the state with an update log of the given capacity.
    pub fn new(update_capacity: usize, debug: bool) -> Self {
        DeviceState {
            updates: UpdateLog::new(update_capacity),
            debug,
            rejected_updates: 0,
        }
    }
}

/// Send a `Stat` diagnostic if debug mode is on.
fn send_status<T: Transport>(cmd: &mut Command<'_, T>, debug: bool, text: &str) {
    if !debug {
        return;
    }
    match cmd.sender().send_cmd(CMD_STATUS, text) {
        Ok(true) => {}
        Ok(false) => debug!("outgoing command open, status dropped: {}", text),
        Err(e) => warn!("failed to send status: {}", e),
    }
}

/// `Vivo`: reply with a keep-alive of our own.
pub fn on_keep_alive<T: Transport>(cmd: &mut Command<'_, T>, _state: &mut DeviceState) {
    let tx = cmd.sender();
    let result = tx.begin(CMD_KEEP_ALIVE).and_then(|()| tx.end());
    if let Err(e) = result {
        warn!("failed to answer keep-alive: {}", e);
    }
}

/// `Resp`: queue every `<position>=<value>` argument.
pub fn on_update<T: Transport>(cmd: &mut Command<'_, T>, state: &mut DeviceState) {
    while let Some(arg) = cmd.next_arg() {
        let Some(entry) = arg.as_str().and_then(UpdateEntry::parse) else {
            debug!("skipping malformed update argument {:?}", arg);
            continue;
        };

        match state.updates.try_push(entry) {
            Ok(()) => {
                let text = format!("Update {} with {}", entry.position, entry.value);
                send_status(cmd, state.debug, &text);
            }
            Err(e) => {
                warn!("dropping update {}: {}", entry, e);
                state.rejected_updates += 1;
            }
        }
    }
}

/// Fallback for identifiers without a handler.
pub fn on_unknown_command<T: Transport>(cmd: &mut Command<'_, T>, state: &mut DeviceState) {
    let text = format!("Unknown IOCP-Command: {}", cmd.full_command());
    warn!("{}", text);
    send_status(cmd, state.debug, &text);
}

/// Register the device handlers on `messenger`.
///
/// In debug mode the host is told once the handlers are in place.
pub fn attach_command_callbacks<T>(
    messenger: &mut Messenger<T, DeviceState>,
    debug: bool,
) -> MessengerResult<()>
where
    T: Transport + 'static,
{
    messenger.attach_default(on_unknown_command::<T>);
    messenger.attach(CMD_KEEP_ALIVE, on_keep_alive::<T>);
    messenger.attach(CMD_UPDATE, on_update::<T>);

    if debug {
        messenger.send_cmd(CMD_STATUS, "Attached callbacks")?;
    }
    Ok(())
}

/// Apply and clear all pending updates. Returns how many were applied.
pub fn apply_updates(state: &mut DeviceState) -> usize {
    let mut applied = 0;
    for entry in state.updates.drain() {
        info!("Updating {} --> {}", entry.position, entry.value);
        applied += 1;
    }
    applied
}
