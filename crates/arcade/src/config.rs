use anyhow::{ensure, Context};
use arcade_lib::lobby::{GameType, LobbyOptions};
use arcade_lib::MAX_TEXT_LEN;

pub const DEFAULT_PORT: u16 = 42932;
pub const DEFAULT_LOBBY_NAME: &str = "arcade lobby";
pub const DEFAULT_CAPACITY: usize = 2;

/// Settings for a headless host, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub port: u16,
    pub lobby: LobbyOptions,
}

impl HostConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, which returns the value of a variable if set.
    ///
    /// A malformed `PORT` falls back to the default; malformed or oversized lobby
    /// settings are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let name = lookup("ARCADE_LOBBY_NAME").unwrap_or_else(|| DEFAULT_LOBBY_NAME.to_owned());
        let game_type = match lookup("ARCADE_GAME") {
            Some(game) => game.parse::<GameType>()?,
            None => GameType::default(),
        };
        let capacity = match lookup("ARCADE_CAPACITY") {
            Some(capacity) => capacity
                .parse()
                .with_context(|| format!("ARCADE_CAPACITY must be a number, got '{capacity}'"))?,
            None => DEFAULT_CAPACITY,
        };
        let code = lookup("ARCADE_CODE").filter(|code| !code.is_empty());
        ensure!(
            name.len() <= MAX_TEXT_LEN,
            "ARCADE_LOBBY_NAME is limited to {MAX_TEXT_LEN} bytes"
        );
        ensure!(
            code.as_ref().map_or(true, |c| c.len() <= MAX_TEXT_LEN),
            "ARCADE_CODE is limited to {MAX_TEXT_LEN} bytes"
        );

        Ok(Self {
            port,
            lobby: LobbyOptions {
                name,
                game_type,
                capacity,
                code,
            },
        })
    }
}
