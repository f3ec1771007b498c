use std::sync::{Arc, Mutex, PoisonError};

use arcade_lib::lobby::{Admission, JoinStatus, Lobby, LobbySnapshot, Removal};
use arcade_lib::net::Message;
use arcade_lib::{ClientId, LobbyId};
use tracing::instrument;

use crate::collab::{Client, Screen, Services};
use crate::event::LobbyEvent;
use crate::render::{self, Style, Surface};

use super::ViewState;

const TABLE_WIDTH: usize = 40;
const TABLE_TOP: usize = 4;

const FOOTER_HOST: &str = "[S]tart game       [C]ancel";
const FOOTER_NONHOST: &str = "[C]ancel";

/// Reacts to everything that happens to this process's lobby.
///
/// Every inbound path (protocol requests, liveness events, local keys, the
/// periodic tick) goes through here, as does every outbound send. Only the
/// process whose id is the lobby's host mutates membership in answer to
/// requests; the others follow the snapshots the host sends them.
pub struct LobbyController {
    local_id: ClientId,
    lobby: Arc<Lobby>,
    services: Services,
    state: Mutex<ViewState>,
}

impl LobbyController {
    pub fn new(local_id: impl Into<ClientId>, lobby: Arc<Lobby>, services: Services) -> Self {
        Self {
            local_id: local_id.into(),
            lobby,
            services,
            state: Mutex::new(ViewState::Viewing),
        }
    }

    pub fn local_id(&self) -> ClientId {
        self.local_id
    }

    pub fn lobby(&self) -> &Arc<Lobby> {
        &self.lobby
    }

    pub fn state(&self) -> ViewState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_host(&self) -> bool {
        self.lobby.is_host(self.local_id)
    }

    #[instrument(skip_all, fields(local_id = %self.local_id))]
    pub fn handle_event(&self, event: LobbyEvent) {
        match event {
            LobbyEvent::ClientDisconnect { client_id } => self.drop_player(client_id),
            LobbyEvent::Heartbeat {
                client_id,
                metadata,
            } => match LobbySnapshot::from_metadata(&metadata) {
                Ok(snapshot) => self.reconcile(client_id, snapshot),
                Err(e) => {
                    tracing::warn!(%client_id, "Ignoring undecodable heartbeat metadata: {e}");
                }
            },
            LobbyEvent::Key('c' | 'C') => self.cancel(),
            LobbyEvent::Key('s' | 'S') => self.start(),
            LobbyEvent::Key(_) => (),
        }
    }

    /// Answer a message from `from`. Requests get a reply; everything else gets `None`.
    #[instrument(skip_all, fields(from = %from.id))]
    pub fn handle_request(&self, from: &Client, message: Message) -> Option<Message> {
        match message {
            Message::Hello => Some(self.lobby.snapshot().into()),
            Message::Join { code, player_id } => {
                if !self.is_host() {
                    tracing::warn!(%player_id, "Join request sent to a process that isn't hosting");
                    return None;
                }
                if player_id != from.id {
                    tracing::warn!(%player_id, "Ignoring join on behalf of another client");
                    return None;
                }
                Some(self.join(player_id, &code))
            }
            Message::Leave { player_id } => {
                if !self.is_host() {
                    tracing::warn!(%player_id, "Leave request sent to a process that isn't hosting");
                } else if player_id != from.id {
                    tracing::warn!(%player_id, "Ignoring leave on behalf of another client");
                } else {
                    self.drop_player(player_id);
                }
                None
            }
            Message::StartGame { game_id } => {
                self.start_from_remote(game_id);
                None
            }
            Message::LobbyInfo { lobby } => {
                self.reconcile(from.id, lobby);
                None
            }
            Message::LobbyClosed { lobby_id } => {
                self.closed_by_host(from.id, lobby_id);
                None
            }
            Message::Heartbeat { metadata } => {
                self.handle_event(LobbyEvent::Heartbeat {
                    client_id: from.id,
                    metadata,
                });
                None
            }
            m @ (Message::Error { .. }
            | Message::Version { .. }
            | Message::ConnectionAccept { .. }
            | Message::JoinReply { .. }) => {
                tracing::warn!("Unexpected message in lobby: {m:?}");
                None
            }
        }
    }

    /// Send the current lobby to every known client except distributors.
    pub fn broadcast(&self) {
        let recipients = self.recipients();
        if recipients.is_empty() {
            return;
        }

        let lobby = self.lobby.snapshot();
        for client in &recipients {
            self.services.network.send(client, lobby.clone().into());
        }
        tracing::trace!(recipients = recipients.len(), "Broadcast lobby");
    }

    /// Tell everyone the lobby is gone and leave it.
    pub fn broadcast_shutdown(&self) {
        if !self.finish(ViewState::Left) {
            return;
        }

        let lobby_id = self.lobby.id();
        for client in self.recipients() {
            self.services
                .network
                .send(&client, Message::LobbyClosed { lobby_id });
        }
        tracing::info!(%lobby_id, "Lobby closed");
        self.services.navigator.set_view(Screen::GamesList);
    }

    /// Periodic work: hosts re-broadcast, everyone redraws.
    pub fn tick(&self) {
        if self.state() != ViewState::Viewing {
            return;
        }
        if self.is_host() {
            self.broadcast();
        }
        self.services.navigator.request_render();
    }

    pub fn heartbeat_metadata(&self) -> LobbySnapshot {
        self.lobby.snapshot()
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        let lobby = self.lobby.read();
        let (_, height) = surface.size();

        let header = lobby.game_type.to_string().to_uppercase();
        render::draw_centered(surface, 1, Style::Normal, &header);

        let left = render::centered(surface, TABLE_WIDTH);
        let bottom = TABLE_TOP + 5 + lobby.capacity;
        surface.draw_box(left, TABLE_TOP, left + TABLE_WIDTH - 1, bottom, Style::Normal);

        render::draw_field(surface, TABLE_TOP + 1, "Name: ", &lobby.name);
        let visibility = if lobby.private {
            format!("private, Join Code: {}", lobby.code)
        } else {
            "public".to_owned()
        };
        render::draw_field(surface, TABLE_TOP + 2, "Visibility: ", &visibility);
        let capacity = format!("({}/{})", lobby.player_ids.len(), lobby.capacity);
        render::draw_field(surface, TABLE_TOP + 3, "Game capacity: ", &capacity);

        for (row, &player_id) in lobby.player_ids.iter().enumerate() {
            let mut line = player_id.to_string();
            if lobby.is_host(player_id) {
                line.push_str(" (host)");
            }
            if player_id == self.local_id {
                line.push_str(" *");
            }
            render::draw_centered(surface, TABLE_TOP + 5 + row, Style::Highlight, &line);
        }

        let footer = if lobby.is_host(self.local_id) {
            FOOTER_HOST
        } else {
            FOOTER_NONHOST
        };
        render::draw_centered(surface, height.saturating_sub(2), Style::Normal, footer);
    }
}

// ----------------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------------
impl LobbyController {
    fn join(&self, player_id: ClientId, code: &str) -> Message {
        match self.lobby.admit(player_id, code) {
            Ok((Admission::Added, lobby)) => {
                self.services.heartbeats.begin_heartbeats(player_id);
                tracing::info!(%player_id, "Player joined lobby");
                self.broadcast();
                self.services.navigator.request_render();
                Message::JoinReply {
                    lobby: Some(lobby),
                    status: JoinStatus::Ok,
                }
            }
            Ok((Admission::AlreadyMember, lobby)) => {
                tracing::debug!(%player_id, "Repeated join from a member");
                Message::JoinReply {
                    lobby: Some(lobby),
                    status: JoinStatus::Ok,
                }
            }
            Err(status) => {
                tracing::info!(%player_id, ?status, "Join rejected");
                Message::join_rejected(status)
            }
        }
    }

    fn drop_player(&self, player_id: ClientId) {
        match self.lobby.remove_player(player_id) {
            Removal::Absent => {
                tracing::debug!(%player_id, "Player already left the lobby");
                return;
            }
            Removal::Removed => tracing::info!(%player_id, "Player left lobby"),
            Removal::RemovedHost => {
                let host = self.lobby.promote_next_host();
                tracing::info!(%player_id, "Host left lobby, {host:?} is now the host");
                if host == Some(self.local_id) {
                    tracing::info!("Took over hosting the lobby");
                }
            }
        }

        if self.is_host() {
            self.broadcast();
        }
        self.services.navigator.request_render();
    }

    /// Adopt a snapshot if it comes from the host it names. Hosts keep their own state.
    fn reconcile(&self, from: ClientId, snapshot: LobbySnapshot) {
        if snapshot.id != self.lobby.id() {
            tracing::debug!(lobby_id = %snapshot.id, "Ignoring snapshot of another lobby");
            return;
        }
        if self.is_host() {
            return;
        }
        if !snapshot.is_host(from) {
            tracing::debug!("Ignoring snapshot from a non-host");
            return;
        }
        if let Err(e) = snapshot.validate() {
            tracing::warn!("Ignoring inconsistent snapshot: {e}");
            return;
        }

        self.lobby.apply_snapshot(snapshot);
        self.services.navigator.request_render();
    }

    fn start(&self) {
        let lobby = {
            let lobby = self.lobby.read();
            if !lobby.is_host(self.local_id) {
                tracing::debug!("Only the host can start the game");
                return;
            }
            lobby.clone()
        };
        // Claim the transition first so only one start fans out
        if !self.finish(ViewState::Transitioning) {
            return;
        }

        for &player_id in lobby.player_ids.iter().filter(|&&id| id != self.local_id) {
            self.send_to(player_id, Message::StartGame { game_id: lobby.id });
        }
        tracing::info!(players = ?lobby.player_ids, "Starting game");
        self.services.navigator.set_view(Screen::Game(lobby));
    }

    fn start_from_remote(&self, game_id: LobbyId) {
        let lobby = self.lobby.snapshot();
        if game_id != lobby.id {
            tracing::debug!(%game_id, "Ignoring start for another lobby");
            return;
        }
        self.enter_game(lobby);
    }

    fn enter_game(&self, lobby: LobbySnapshot) {
        if self.finish(ViewState::Transitioning) {
            tracing::info!(players = ?lobby.player_ids, "Starting game");
            self.services.navigator.set_view(Screen::Game(lobby));
        }
    }

    fn cancel(&self) {
        if self.is_host() {
            self.broadcast_shutdown();
            return;
        }

        if let Some(host_id) = self.lobby.host_id() {
            self.send_to(
                host_id,
                Message::Leave {
                    player_id: self.local_id,
                },
            );
        }
        if self.finish(ViewState::Left) {
            self.services.navigator.set_view(Screen::GamesList);
        }
    }

    fn closed_by_host(&self, from: ClientId, lobby_id: LobbyId) {
        let lobby = self.lobby.snapshot();
        if lobby.id != lobby_id || !lobby.is_host(from) {
            tracing::debug!(%lobby_id, "Ignoring close notice");
            return;
        }

        tracing::info!("Host closed the lobby");
        if self.finish(ViewState::Left) {
            self.services.navigator.set_view(Screen::GamesList);
        }
    }

    /// Move out of `Viewing`. Only the first call succeeds.
    fn finish(&self, next: ViewState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != ViewState::Viewing {
            return false;
        }
        *state = next;
        true
    }

    fn send_to(&self, id: ClientId, message: Message) {
        match self.services.network.get_client(id) {
            Some(client) => self.services.network.send(&client, message),
            None => tracing::warn!(client_id = %id, "No connection to client, message dropped"),
        }
    }

    // Collect first and send after, so sends never run inside the network's iteration
    fn recipients(&self) -> Vec<Client> {
        let mut recipients = Vec::new();
        self.services.network.clients_range(&mut |client| {
            if !client.distributor {
                recipients.push(client.clone());
            }
            true
        });
        recipients
    }
}
