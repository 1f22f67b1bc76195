//! # Shared Game Core
//!
//! Everything both peers need to agree on: the grid simulation itself and the
//! packets that carry it over the wire.
//!
//! ## Simulation
//!
//! [`Game`] owns the snakes, pickups and projectiles and advances them one
//! tick at a time. A tick runs its phases in a fixed order:
//!
//! 1. Countdown. Reaching zero ends the match and nothing else runs.
//! 2. Movement, with border deaths.
//! 3. Collisions, evaluated against post-move positions and applied at once.
//! 4. Projectiles (combat ruleset only).
//! 5. Pickup consumption and top-up.
//! 6. Observer notification.
//!
//! Dead snakes vanish immediately and come back after a delay. The delay is
//! a [`DeferredQueue`] entry driven by [`Game::advance_clock`], so removing a
//! snake or resetting the game cancels its return.
//!
//! ## Synchronization
//!
//! The host is the only peer that ticks. It exports [`GameSnapshot`]s, which
//! carry each snake as a head and a length. Followers merge them with
//! [`Game::apply_network_state`], rebuilding bodies from what they already
//! know instead of resetting local state.
//!
//! ## Protocol
//!
//! [`Packet`] is the single message type exchanged over UDP, serialized with
//! bincode. Inputs are sequenced per client and acknowledged through
//! `last_processed_input` in each `GameState` packet.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod config;
pub mod game;
pub mod ids;
pub mod input;
pub mod pickup;
pub mod projectile;
pub mod snake;
pub mod snapshot;
pub mod timer;
pub mod vector;

pub use config::{ConfigError, GameConfig, Ruleset, SpawnPoint};
pub use game::{Game, GameObserver, GameView, TickOutcome};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use input::{Action, KeyMap, FIRE_KEY};
pub use pickup::{Pickup, PickupEffect, PickupKind};
pub use projectile::Projectile;
pub use snake::{Snake, SnakeOptions};
pub use snapshot::{GameSnapshot, SnakeSnapshot, SnapshotError};
pub use timer::{DeferredQueue, TimerHandle};
pub use vector::Vector;

/// Bumped whenever `Packet` changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        name: String,
    },
    Input {
        sequence: u32,
        timestamp: u64,
        key: String,
    },
    Start,
    /// Keeps an idle peer from timing out
    Heartbeat {
        timestamp: u64,
    },
    Disconnect,

    Connected {
        client_id: u32,
        /// `None` for spectators
        player_id: Option<String>,
    },
    PlayerList {
        players: Vec<PlayerInfo>,
    },
    Started {
        config: GameConfig,
    },
    GameState {
        tick: u32,
        timestamp: u64,
        last_processed_input: HashMap<u32, u32>,
        snapshot: GameSnapshot,
    },
    GameOver {
        winner_id: Option<String>,
        winner_name: Option<String>,
    },
    Disconnected {
        reason: String,
    },
}

/// One roster entry as shown to every peer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub client_id: u32,
    pub name: String,
    pub player_id: Option<String>,
    pub is_spectator: bool,
}

/// A raw key press with its ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub sequence: u32,
    pub timestamp: u64,
    pub key: String,
}
