//! # Snake Arena Host
//!
//! The authoritative side of a match. The host owns the only copy of the
//! simulation that actually ticks; every other peer follows its snapshots.
//!
//! ## Responsibilities
//!
//! ### Lobby
//! Peers connect with a name and are seated as `P1`, `P2`, ... up to the
//! configured player limit. Anyone beyond that watches as a spectator.
//! Player ids are never reused within a host's lifetime, so a late packet
//! from a departed peer cannot steer somebody else's snake.
//!
//! ### Input Ordering
//! Key presses arrive sequenced per client. Each tick the host applies every
//! queued press across all clients in timestamp order, then acknowledges the
//! highest sequence it consumed for each client.
//!
//! ### Broadcasting
//! After every tick the host sends a `GameState` packet carrying the full
//! snapshot. When the countdown runs out it follows up with `GameOver`
//! naming the winner.
//!
//! ## Architecture
//!
//! One event loop owns the [`shared::Game`]. Three background tasks feed it:
//! - **Network Receiver**: decodes datagrams into packets
//! - **Network Sender**: drains the outgoing queue and fans out broadcasts
//! - **Timeout Checker**: drops clients that have gone quiet
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use host::network::Server;
//! use shared::GameConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", GameConfig::default(), 16).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod session;
