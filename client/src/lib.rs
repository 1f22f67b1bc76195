//! # Snake Arena Client
//!
//! A follower peer. It never decides anything about the match: the host
//! ticks, and the client merges the snapshots it receives into a local
//! [`shared::Game`].
//!
//! ## Architecture Overview
//!
//! ### Snapshot Following
//! Each `GameState` packet carries a lossy snapshot where snakes travel as a
//! head and a length. The local game rebuilds bodies from what it already
//! knows, so a missed packet costs a little accuracy instead of a reset.
//! Snapshots older than the newest one applied are dropped, since UDP may
//! reorder them.
//!
//! ### Local Prediction
//! Our own turns are applied to the local snake as soon as they are typed.
//! They stay in an input history until the host acknowledges their sequence
//! number, and every snapshot replays the ones still pending. Firing is left
//! to the host.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! - Local `Game` fed by snapshots
//! - Input history and replay
//! - The `Time: Ns | name: score` status line
//!
//! ### Input Module (`input`)
//! - Terminal line parsing into key names and commands
//! - Input sequence numbering
//!
//! ### Network Module (`network`)
//! - UDP socket and connection handshake
//! - Packet serialization and deserialization
//! - Heartbeats so an idle player is not timed out
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", "alice", 0, true).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
