pub use controller::LobbyController;
pub use lobby_view::LobbyView;

mod controller;
mod lobby_view;

/// Where a lobby view is in its short life. Both non-initial states are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ViewState {
    Viewing,
    /// Handed off to the game.
    Transitioning,
    /// Cancelled, back to the games list.
    Left,
}
