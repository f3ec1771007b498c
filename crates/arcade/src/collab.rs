//! Interfaces to the parts of the process that live outside the lobby.
//!
//! The lobby controller never looks these up globally; a [`Services`] bundle is
//! handed to it at construction.

use std::sync::Arc;

use arcade_lib::{lobby::LobbySnapshot, net::Message, ClientId};

/// An addressable peer as known to the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    /// Relays that should never receive lobby broadcasts.
    pub distributor: bool,
}

impl Client {
    pub fn player(id: impl Into<ClientId>) -> Self {
        Self {
            id: id.into(),
            distributor: false,
        }
    }

    pub fn distributor(id: impl Into<ClientId>) -> Self {
        Self {
            id: id.into(),
            distributor: true,
        }
    }
}

pub trait Network: Send + Sync {
    /// Fire-and-forget. Delivery failures are the network's concern.
    fn send(&self, client: &Client, message: Message);

    fn get_client(&self, id: ClientId) -> Option<Client>;

    /// Visit every known client until `visit` returns `false`.
    fn clients_range(&self, visit: &mut dyn FnMut(&Client) -> bool);
}

pub trait Heartbeats: Send + Sync {
    /// Start liveness tracking for a player who just joined.
    fn begin_heartbeats(&self, player_id: ClientId);
}

/// Screens the lobby can hand off to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    GamesList,
    /// Set up and enter the game for these players.
    Game(LobbySnapshot),
}

pub trait Navigator: Send + Sync {
    fn set_view(&self, screen: Screen);
    fn request_render(&self);
}

#[derive(Clone)]
pub struct Services {
    pub network: Arc<dyn Network>,
    pub heartbeats: Arc<dyn Heartbeats>,
    pub navigator: Arc<dyn Navigator>,
}
