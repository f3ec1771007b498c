use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arcade_lib::lobby::LobbySnapshot;
use arcade_lib::net::Message;

use crate::collab::Client;
use crate::event::LobbyEvent;
use crate::liveness::{LivenessLoop, TICK_INTERVAL};
use crate::render::Surface;

use super::LobbyController;

/// The screen a player sees while waiting in a lobby.
///
/// Owns the tick loop; everything else is forwarded to the [`LobbyController`].
pub struct LobbyView {
    controller: Arc<LobbyController>,
    period: Duration,
    ticker: Mutex<Option<LivenessLoop>>,
}

impl LobbyView {
    pub fn new(controller: LobbyController) -> Self {
        Self::with_period(controller, TICK_INTERVAL)
    }

    pub fn with_period(controller: LobbyController, period: Duration) -> Self {
        Self {
            controller: Arc::new(controller),
            period,
            ticker: Mutex::new(None),
        }
    }

    pub fn controller(&self) -> &Arc<LobbyController> {
        &self.controller
    }

    /// Start ticking. Must be called from within a tokio runtime.
    pub fn init(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            tracing::warn!("Lobby view initialized twice");
            return;
        }

        let controller = self.controller.clone();
        *ticker = Some(LivenessLoop::spawn(self.period, move || controller.tick()));
        tracing::debug!(lobby_id = %self.controller.lobby().id(), "Lobby view initialized");
    }

    pub fn process_event(&self, event: LobbyEvent) {
        self.controller.handle_event(event);
    }

    pub fn process_message(&self, from: &Client, message: Message) -> Option<Message> {
        self.controller.handle_request(from, message)
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        self.controller.render(surface);
    }

    pub fn heartbeat_metadata(&self) -> LobbySnapshot {
        self.controller.heartbeat_metadata()
    }

    /// Stop ticking and wait for the loop to exit. Later calls do nothing.
    pub async fn unload(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.stop().await;
            tracing::debug!("Lobby view unloaded");
        }
    }
}
