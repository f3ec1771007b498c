use arcade_lib::ClientId;

/// Inputs to the lobby view that don't arrive as protocol requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// A heartbeat from `client_id` carrying its lobby snapshot as metadata.
    Heartbeat { client_id: ClientId, metadata: Vec<u8> },
    /// The liveness subsystem gave up on `client_id`.
    ClientDisconnect { client_id: ClientId },
    /// A key pressed by the local user.
    Key(char),
}

/// Turn a line read from the terminal into key events.
///
/// Returns `None` once input is over. Unreadable input ends it too, since the
/// reader can't be trusted to resync.
pub fn key_events(line: std::io::Result<Option<String>>) -> Option<Vec<LobbyEvent>> {
    match line {
        Ok(Some(line)) => Some(line.chars().map(LobbyEvent::Key).collect()),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable terminal input: {e}");
            None
        }
    }
}
