use crate::lobby::{JoinStatus, LobbySnapshot};
use crate::{ClientId, LobbyId};
use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// Everything peers say to each other.
///
/// Requests (`Hello`, `Join`) are answered by the lobby's host. Every other kind
/// is one-way. No variant borrows from a live [`crate::lobby::Lobby`]; lobby state
/// always travels as an owned [`LobbySnapshot`].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum Message {
    Error { error: ProtocolError },
    /// First frame on every connection. Distributors are relays that never
    /// receive lobby broadcasts.
    Version { version: String, distributor: bool },
    ConnectionAccept { client_id: ClientId },
    Hello,
    Join { code: String, player_id: ClientId },
    JoinReply {
        lobby: Option<LobbySnapshot>,
        status: JoinStatus,
    },
    Leave { player_id: ClientId },
    StartGame { game_id: LobbyId },
    LobbyInfo { lobby: LobbySnapshot },
    /// The host cancelled the lobby.
    LobbyClosed { lobby_id: LobbyId },
    /// Carrier for the heartbeat subsystem; `metadata` is opaque to the transport.
    Heartbeat { metadata: Vec<u8> },
}

impl Message {
    pub fn expects_reply(&self) -> bool {
        matches!(self, Message::Hello | Message::Join { .. })
    }

    pub fn join_rejected(status: JoinStatus) -> Self {
        Self::JoinReply {
            lobby: None,
            status,
        }
    }
}

impl From<LobbySnapshot> for Message {
    fn from(lobby: LobbySnapshot) -> Self {
        Self::LobbyInfo { lobby }
    }
}
