use std::sync::Arc;
use std::time::Duration;

use arcade::collab::{Navigator, Screen, Services};
use arcade::config::HostConfig;
use arcade::event;
use arcade::lobby::{LobbyController, LobbyView};
use arcade::net::{self, PeerNetwork};
use arcade::render::TextSurface;
use arcade_lib::lobby::Lobby;
use arcade_lib::{ClientId, LobbyId};
use rand::{thread_rng, Rng};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::{mpsc, Notify};

// Time for queued frames to reach peers before the process exits
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Screen changes go to the main loop, which owns the terminal.
struct HeadlessNavigator {
    screens: mpsc::UnboundedSender<Screen>,
    render: Notify,
}

impl HeadlessNavigator {
    fn new() -> (Self, mpsc::UnboundedReceiver<Screen>) {
        let (screens, rx) = mpsc::unbounded_channel();
        let navigator = Self {
            screens,
            render: Notify::new(),
        };
        (navigator, rx)
    }
}

impl Navigator for HeadlessNavigator {
    fn set_view(&self, screen: Screen) {
        let _ = self.screens.send(screen);
    }

    fn request_render(&self) {
        self.render.notify_one();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    tracing::info!("Arcade Version: {}", arcade::VERSION);

    let config = HostConfig::from_env()?;
    let host_id: ClientId = thread_rng().gen::<u32>().into();
    let lobby_id: LobbyId = thread_rng().gen::<u32>().into();
    let lobby = Arc::new(Lobby::new(lobby_id, host_id, config.lobby)?);

    let network = Arc::new(PeerNetwork::new(host_id));
    let (navigator, mut screens) = HeadlessNavigator::new();
    let navigator = Arc::new(navigator);
    let services = Services {
        network: network.clone(),
        heartbeats: network.clone(),
        navigator: navigator.clone(),
    };
    let view = Arc::new(LobbyView::new(LobbyController::new(
        host_id, lobby, services,
    )));

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(%lobby_id, %host_id, "Hosting lobby on port {}", config.port);
    view.init();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut surface = TextSurface::new(80, 24);
    let mut last_frame = String::new();

    let screen = loop {
        select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => {
                    tracing::debug!(%addr, "Accepted connection");
                    tokio::spawn(net::handle_new_connection(view.clone(), network.clone(), socket));
                }
                Err(e) => tracing::error!("Failed to accept connection: {e}"),
            },
            line = stdin.next_line(), if stdin_open => match event::key_events(line) {
                Some(keys) => keys.into_iter().for_each(|key| view.process_event(key)),
                None => stdin_open = false,
            },
            Some(screen) = screens.recv() => break screen,
            _ = navigator.render.notified() => {
                surface.clear();
                view.render(&mut surface);
                let frame = surface.to_string();
                if frame != last_frame {
                    println!("{frame}");
                    last_frame = frame;
                }
            }
            _ = tokio::signal::ctrl_c() => view.controller().broadcast_shutdown(),
        }
    };

    match screen {
        Screen::GamesList => tracing::info!("Left the lobby"),
        Screen::Game(lobby) => tracing::info!(
            players = ?lobby.player_ids,
            "Starting {} for {} players",
            lobby.game_type,
            lobby.player_ids.len()
        ),
    }

    view.unload().await;
    tracing::debug!(peers = network.len(), "Waiting for queued frames");
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    Ok(())
}
