use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arcade_lib::lobby::{Lobby, LobbyOptions};
use arcade_lib::net::Message;
use arcade_lib::ClientId;

use crate::collab::{Client, Heartbeats, Navigator, Network, Screen, Services};

pub const LOBBY_ID: u32 = 0x10;
pub const HOST: u32 = 0;

/// Records every outgoing message instead of sending it.
#[derive(Default)]
pub struct MockNetwork {
    clients: Mutex<Vec<Client>>,
    sent: Mutex<Vec<(ClientId, Message)>>,
}

impl MockNetwork {
    pub fn add_client(&self, client: Client) {
        self.clients.lock().unwrap().push(client);
    }

    pub fn take_sent(&self) -> Vec<(ClientId, Message)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Network for MockNetwork {
    fn send(&self, client: &Client, message: Message) {
        self.sent.lock().unwrap().push((client.id, message));
    }

    fn get_client(&self, id: ClientId) -> Option<Client> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn clients_range(&self, visit: &mut dyn FnMut(&Client) -> bool) {
        let clients = self.clients.lock().unwrap().clone();
        for client in &clients {
            if !visit(client) {
                break;
            }
        }
    }
}

#[derive(Default)]
pub struct MockHeartbeats {
    pub tracked: Mutex<Vec<ClientId>>,
}

impl Heartbeats for MockHeartbeats {
    fn begin_heartbeats(&self, player_id: ClientId) {
        self.tracked.lock().unwrap().push(player_id);
    }
}

#[derive(Default)]
pub struct MockNavigator {
    pub screens: Mutex<Vec<Screen>>,
    pub renders: AtomicUsize,
}

impl MockNavigator {
    pub fn screens(&self) -> Vec<Screen> {
        self.screens.lock().unwrap().clone()
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Navigator for MockNavigator {
    fn set_view(&self, screen: Screen) {
        self.screens.lock().unwrap().push(screen);
    }

    fn request_render(&self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub network: Arc<MockNetwork>,
    pub heartbeats: Arc<MockHeartbeats>,
    pub navigator: Arc<MockNavigator>,
}

impl Harness {
    pub fn new(clients: impl IntoIterator<Item = Client>) -> Self {
        let network = Arc::new(MockNetwork::default());
        for client in clients {
            network.add_client(client);
        }
        Self {
            network,
            heartbeats: Default::default(),
            navigator: Default::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            network: self.network.clone(),
            heartbeats: self.heartbeats.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

/// A lobby hosted by [`HOST`].
pub fn hosted_lobby(capacity: usize, code: Option<&str>) -> Arc<Lobby> {
    Arc::new(
        Lobby::new(
            LOBBY_ID,
            HOST,
            LobbyOptions {
                name: "test lobby".to_owned(),
                capacity,
                code: code.map(str::to_owned),
                ..Default::default()
            },
        )
        .unwrap(),
    )
}
