use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ClientId, LobbyId, MAX_CAPACITY, MAX_TEXT_LEN};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Attempted to add a player to a full lobby")]
    Capacity,
    #[error("Player {0:#} is already in this lobby")]
    Duplicate(ClientId),
    #[error("Lobby capacity must be between 1 and {MAX_CAPACITY}, got {0}")]
    InvalidCapacity(usize),
    #[error("Host {0:#} is not a member of the lobby")]
    HostNotMember(ClientId),
    #[error("Lobby names and codes are limited to {MAX_TEXT_LEN} bytes, got {0}")]
    TextTooLong(usize),
    #[error("Unknown game type '{0}'")]
    UnknownGameType(String),
}

pub type LobbyResult<T> = Result<T, LobbyError>;

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GameType {
    #[default]
    Pong,
    Tron,
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Pong => f.write_str("Pong"),
            GameType::Tron => f.write_str("Tron"),
        }
    }
}

impl FromStr for GameType {
    type Err = LobbyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pong" => Ok(GameType::Pong),
            "tron" => Ok(GameType::Tron),
            _ => Err(LobbyError::UnknownGameType(s.to_owned())),
        }
    }
}

/// Outcome of a join request. Rejections are ordinary replies, not failures.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JoinStatus {
    Ok,
    ErrCapacity,
    ErrWrongCode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Removal {
    Absent,
    Removed,
    /// The removed player was the host. Picking a successor is up to the caller.
    RemovedHost,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Admission {
    Added,
    AlreadyMember,
}

/// Settings a host chooses when opening a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyOptions {
    pub name: String,
    pub game_type: GameType,
    pub capacity: usize,
    /// Setting a code makes the lobby private.
    pub code: Option<String>,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            name: "arcade lobby".to_owned(),
            game_type: GameType::default(),
            capacity: 2,
            code: None,
        }
    }
}

/// An owned copy of a lobby, safe to hand to the network or the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbySnapshot {
    pub id: LobbyId,
    pub name: String,
    pub game_type: GameType,
    pub host_id: Option<ClientId>,
    pub capacity: usize,
    /// Members in join order.
    pub player_ids: Vec<ClientId>,
    pub private: bool,
    pub code: String,
}

impl LobbySnapshot {
    pub fn is_full(&self) -> bool {
        self.player_ids.len() >= self.capacity
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.player_ids.contains(&id)
    }

    pub fn is_host(&self, id: ClientId) -> bool {
        self.host_id == Some(id)
    }

    /// Encode this snapshot for embedding in a heartbeat.
    pub fn to_metadata(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_metadata(metadata: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(metadata)
    }

    /// Check the membership invariants of a snapshot that came from elsewhere.
    pub fn validate(&self) -> LobbyResult<()> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(LobbyError::InvalidCapacity(self.capacity));
        }
        if self.player_ids.len() > self.capacity {
            return Err(LobbyError::Capacity);
        }
        let mut seen = HashSet::with_capacity(self.player_ids.len());
        if let Some(&dup) = self.player_ids.iter().find(|&&id| !seen.insert(id)) {
            return Err(LobbyError::Duplicate(dup));
        }
        if let Some(host) = self.host_id.filter(|&h| !self.contains(h)) {
            return Err(LobbyError::HostNotMember(host));
        }
        Ok(())
    }

    fn insert_player(&mut self, id: ClientId) -> LobbyResult<()> {
        if self.is_full() {
            return Err(LobbyError::Capacity);
        }
        if self.contains(id) {
            return Err(LobbyError::Duplicate(id));
        }
        self.player_ids.push(id);
        // A lobby emptied by departures is claimed by whoever joins next
        if self.host_id.is_none() {
            self.host_id = Some(id);
        }
        Ok(())
    }

    fn remove_player(&mut self, id: ClientId) -> Removal {
        let Some(index) = self.player_ids.iter().position(|&p| p == id) else {
            return Removal::Absent;
        };
        self.player_ids.remove(index);
        if self.is_host(id) {
            Removal::RemovedHost
        } else {
            Removal::Removed
        }
    }
}

/// The live lobby record shared by every context of this process.
///
/// All access goes through a single [`RwLock`]. Multi-field reads should hold
/// one [`Lobby::read`] guard for their whole duration.
#[derive(Debug)]
pub struct Lobby {
    state: RwLock<LobbySnapshot>,
}

impl Lobby {
    /// Open a new lobby with `host_id` as its only member.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::InvalidCapacity`] unless `1 <= capacity <= MAX_CAPACITY`,
    /// and [`LobbyError::TextTooLong`] for a name or code over [`MAX_TEXT_LEN`] bytes.
    pub fn new(
        id: impl Into<LobbyId>,
        host_id: impl Into<ClientId>,
        options: LobbyOptions,
    ) -> LobbyResult<Self> {
        if options.capacity == 0 || options.capacity > MAX_CAPACITY {
            return Err(LobbyError::InvalidCapacity(options.capacity));
        }
        let longest = options.code.as_ref().map_or(0, String::len).max(options.name.len());
        if longest > MAX_TEXT_LEN {
            return Err(LobbyError::TextTooLong(longest));
        }
        let host_id = host_id.into();
        let (private, code) = match options.code {
            Some(code) => (true, code),
            None => (false, String::new()),
        };

        Ok(Self::from_snapshot(LobbySnapshot {
            id: id.into(),
            name: options.name,
            game_type: options.game_type,
            host_id: Some(host_id),
            capacity: options.capacity,
            player_ids: vec![host_id],
            private,
            code,
        }))
    }

    /// Seed a non-host view of a lobby from a snapshot its host sent.
    pub fn from_snapshot(snapshot: LobbySnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, LobbySnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LobbySnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> LobbyId {
        self.read().id
    }

    pub fn host_id(&self) -> Option<ClientId> {
        self.read().host_id
    }

    pub fn is_host(&self, id: ClientId) -> bool {
        self.read().is_host(id)
    }

    /// # Errors
    ///
    /// [`LobbyError::Capacity`] when every seat is taken, checked before
    /// [`LobbyError::Duplicate`].
    pub fn add_player(&self, id: ClientId) -> LobbyResult<()> {
        self.write().insert_player(id)
    }

    /// Removing an absent player is not an error, leave and disconnect may both report it.
    pub fn remove_player(&self, id: ClientId) -> Removal {
        self.write().remove_player(id)
    }

    /// Decide a join request in one critical section.
    ///
    /// A current member is admitted again without any change. Otherwise capacity is
    /// checked first and the join code second, so a full private lobby reports
    /// [`JoinStatus::ErrCapacity`] even for the right code. The returned snapshot
    /// already contains the new player.
    pub fn admit(
        &self,
        id: ClientId,
        code: &str,
    ) -> Result<(Admission, LobbySnapshot), JoinStatus> {
        let mut state = self.write();
        if state.contains(id) {
            return Ok((Admission::AlreadyMember, state.clone()));
        }
        if state.is_full() {
            return Err(JoinStatus::ErrCapacity);
        }
        if state.private && state.code != code {
            return Err(JoinStatus::ErrWrongCode);
        }
        state
            .insert_player(id)
            .map_err(|_| JoinStatus::ErrCapacity)?;
        Ok((Admission::Added, state.clone()))
    }

    /// Hand host authority to the earliest-joined remaining player.
    ///
    /// Every process applying the same removals picks the same successor. Returns
    /// `None` once the lobby is empty.
    pub fn promote_next_host(&self) -> Option<ClientId> {
        let mut state = self.write();
        if let Some(host) = state.host_id.filter(|&h| state.contains(h)) {
            return Some(host);
        }
        state.host_id = state.player_ids.first().copied();
        state.host_id
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        self.read().clone()
    }

    pub fn apply_snapshot(&self, snapshot: LobbySnapshot) {
        *self.write() = snapshot;
    }
}
