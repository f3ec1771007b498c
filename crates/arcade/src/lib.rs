pub mod collab;
pub mod config;
pub mod event;
pub mod liveness;
pub mod lobby;
pub mod net;
pub mod render;

#[cfg(test)]
mod test_utils;

pub const VERSION: &str = env!("ARCADE_VERSION");
