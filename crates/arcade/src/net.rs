//! TCP transport for a hosted lobby.
//!
//! Every accepted socket gets a version handshake, an id, and a writer task fed by
//! a bounded channel. Frames read from the socket are handed to the [`LobbyView`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use abort_on_drop::ChildTask;
use arcade_lib::net::connection::{self, ConnectionRx, ConnectionTx};
use arcade_lib::net::{FrameError, Message, ProtocolError};
use arcade_lib::ClientId;
use rand::{thread_rng, Rng};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::collab::{Client, Heartbeats, Network};
use crate::event::LobbyEvent;
use crate::lobby::LobbyView;

const OUTGOING_CAPACITY: usize = 64;

struct Peer {
    client: Client,
    sender: mpsc::Sender<Message>,
    /// Set once the peer joined the lobby and its departure matters.
    tracked: bool,
    _writer: ChildTask<()>,
}

/// Every peer connected to this process, keyed by the id handed out at handshake.
pub struct PeerNetwork {
    local_id: ClientId,
    peers: RwLock<HashMap<ClientId, Peer>>,
}

impl PeerNetwork {
    pub fn new(local_id: impl Into<ClientId>) -> Self {
        Self {
            local_id: local_id.into(),
            peers: RwLock::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }

    /// Register `client` and start writing to `conn_tx` in the background.
    pub fn attach<W>(&self, client: Client, conn_tx: ConnectionTx<W>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(OUTGOING_CAPACITY);
        let writer = tokio::spawn(send_task(conn_tx, receiver)).into();
        let peer = Peer {
            client: client.clone(),
            sender,
            tracked: false,
            _writer: writer,
        };
        self.peers_mut().insert(client.id, peer);
    }

    /// Forget a peer, stopping its writer. Returns whether it had joined the lobby.
    pub fn detach(&self, id: ClientId) -> bool {
        self.peers_mut()
            .remove(&id)
            .map_or(false, |peer| peer.tracked)
    }

    /// A random id not used by this process or any connected peer.
    pub fn gen_client_id(&self) -> ClientId {
        let mut client_id;
        loop {
            client_id = thread_rng().gen::<u32>().into();
            if client_id != self.local_id && !self.peers().contains_key(&client_id) {
                break;
            }
        }
        client_id
    }

    fn peers(&self) -> RwLockReadGuard<'_, HashMap<ClientId, Peer>> {
        self.peers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn peers_mut(&self) -> RwLockWriteGuard<'_, HashMap<ClientId, Peer>> {
        self.peers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Network for PeerNetwork {
    fn send(&self, client: &Client, message: Message) {
        let peers = self.peers();
        let Some(peer) = peers.get(&client.id) else {
            tracing::debug!(client_id = %client.id, "Dropping message for a departed peer");
            return;
        };
        if let Err(e) = peer.sender.try_send(message) {
            tracing::warn!(client_id = %client.id, "Failed to queue message: {e}");
        }
    }

    fn get_client(&self, id: ClientId) -> Option<Client> {
        self.peers().get(&id).map(|peer| peer.client.clone())
    }

    fn clients_range(&self, visit: &mut dyn FnMut(&Client) -> bool) {
        // Copy out so `visit` is free to call back into the network
        let clients: Vec<Client> = self.peers().values().map(|p| p.client.clone()).collect();
        for client in &clients {
            if !visit(client) {
                break;
            }
        }
    }
}

impl Heartbeats for PeerNetwork {
    fn begin_heartbeats(&self, player_id: ClientId) {
        match self.peers_mut().get_mut(&player_id) {
            Some(peer) => {
                peer.tracked = true;
                tracing::debug!(%player_id, "Tracking connection");
            }
            None => tracing::warn!(%player_id, "Can't track a player without a connection"),
        }
    }
}

async fn send_task<W: AsyncWrite + Unpin>(
    mut conn_tx: ConnectionTx<W>,
    mut receiver: mpsc::Receiver<Message>,
) {
    while let Some(m) = receiver.recv().await {
        match conn_tx.write_frame(&m).await {
            Ok(()) => (),
            // Nothing was written, the stream is still in sync
            Err(FrameError::FrameLength) => tracing::warn!("Dropping oversized frame"),
            Err(e) => {
                tracing::warn!("Failed to write frame: {e}");
                return;
            }
        }
    }
}

/// Take a socket for a newly connected peer and serve it until it closes.
pub async fn handle_new_connection(
    view: Arc<LobbyView>,
    network: Arc<PeerNetwork>,
    socket: TcpStream,
) {
    let (conn_tx, conn_rx) = connection::from_socket(socket);
    serve(view, network, conn_tx, conn_rx).await;
}

pub async fn serve<R, W>(
    view: Arc<LobbyView>,
    network: Arc<PeerNetwork>,
    mut conn_tx: ConnectionTx<W>,
    mut conn_rx: ConnectionRx<R>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client = match handshake(&network, &mut conn_tx, &mut conn_rx).await {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(%error, "Handshake failed");
            let _ = conn_tx.write_frame(&Message::Error { error }).await;
            return;
        }
    };

    network.attach(client.clone(), conn_tx);
    run(&view, &network, &client, conn_rx).await;

    if network.detach(client.id) {
        view.process_event(LobbyEvent::ClientDisconnect {
            client_id: client.id,
        });
    }
}

async fn handshake<R, W>(
    network: &PeerNetwork,
    conn_tx: &mut ConnectionTx<W>,
    conn_rx: &mut ConnectionRx<R>,
) -> Result<Client, ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (version, distributor) = match conn_rx.read_frame().await? {
        Some(Message::Version {
            version,
            distributor,
        }) => (version, distributor),
        Some(_) => return Err(ProtocolError::InvalidMessage),
        None => return Err(ProtocolError::Disconnected),
    };

    if version != crate::VERSION {
        return Err(ProtocolError::VersionMismatch(
            version,
            crate::VERSION.to_owned(),
        ));
    }

    let client_id = network.gen_client_id();
    conn_tx
        .write_frame(&Message::ConnectionAccept { client_id })
        .await?;
    tracing::info!(%client_id, distributor, "New connection opened");

    Ok(Client {
        id: client_id,
        distributor,
    })
}

#[instrument(skip_all, fields(client_id = %client.id))]
async fn run<R: AsyncRead + Unpin>(
    view: &LobbyView,
    network: &PeerNetwork,
    client: &Client,
    mut conn_rx: ConnectionRx<R>,
) {
    loop {
        let message = match conn_rx.read_frame().await {
            Ok(Some(m)) => m,
            Ok(None) => break,
            Err(FrameError::Bincode(e)) => {
                tracing::warn!("Skipping malformed frame: {e}");
                network.send(
                    client,
                    Message::Error {
                        error: ProtocolError::InvalidMessage,
                    },
                );
                continue;
            }
            Err(e) => {
                tracing::error!("Error reading message, closing connection\n{e:?}");
                break;
            }
        };

        tracing::debug!("Received message: {message:?}");
        if let Some(reply) = view.process_message(client, message) {
            network.send(client, reply);
        }
    }
    tracing::info!("Peer disconnected");
}
