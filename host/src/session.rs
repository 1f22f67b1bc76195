//! Lobby and connection state owned by the host
//!
//! The session tracks every connected peer, decides who gets a snake and who
//! only watches, and buffers inputs until the next tick applies them:
//! - Client lifecycle (join, leave, timeout)
//! - Seat assignment: `P1`, `P2`, ... in join order up to the player limit,
//!   each on the lowest free spawn slot
//! - Input buffering in chronological order across clients
//! - Acknowledgement of the last applied input per client
//!
//! Nothing in here touches the simulation. The server loop reads the roster
//! and applies the resulting snake changes itself.

use log::info;
use shared::{InputState, PlayerInfo};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Clients silent for longer than this are dropped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected peer, seated or spectating
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the host
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Display name sent with `Connect`
    pub name: String,
    /// Snake id, `None` for spectators
    pub player_id: Option<String>,
    /// Spawn slot backing `player_id`
    pub slot: Option<usize>,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest input sequence number applied to the game
    pub last_processed_input: u32,
    /// Buffered inputs waiting for the next tick
    pub pending_inputs: Vec<InputState>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, name: String) -> Self {
        Self {
            id,
            addr,
            name,
            player_id: None,
            slot: None,
            last_seen: Instant::now(),
            last_processed_input: 0,
            pending_inputs: Vec::new(),
        }
    }

    pub fn is_spectator(&self) -> bool {
        self.player_id.is_none()
    }

    /// Buffers an input, keeping the queue in sequence order so that
    /// reordered packets are still applied in the order they were sent.
    pub fn add_input(&mut self, input: InputState) {
        self.last_seen = Instant::now();
        if input.sequence <= self.last_processed_input {
            return;
        }
        self.pending_inputs.push(input);
        self.pending_inputs.sort_by_key(|i| i.sequence);
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            client_id: self.id,
            name: self.name.clone(),
            player_id: self.player_id.clone(),
            is_spectator: self.is_spectator(),
        }
    }
}

/// Explicit session state: roster, seats and input queues.
pub struct Session {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    /// Number in the next `P{n}` id handed to a seated player
    next_player_number: usize,
    /// Seats available before joiners become spectators
    player_limit: usize,
    /// Hard cap on connections, spectators included
    max_clients: usize,
}

impl Session {
    pub fn new(player_limit: usize, max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            next_player_number: 1,
            player_limit,
            max_clients,
        }
    }

    /// Admits a new peer. Returns `None` when the session is full.
    ///
    /// Joiners take the lowest free spawn slot while seats remain; everyone
    /// after that spectates. Player ids keep counting up within a match.
    pub fn join(&mut self, addr: SocketAddr, name: &str) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let name = if name.trim().is_empty() {
            format!("Player {}", client_id)
        } else {
            name.trim().to_string()
        };
        let mut client = Client::new(client_id, addr, name);

        if self.seated_count() < self.player_limit {
            let slot = self.lowest_free_slot();
            client.player_id = Some(format!("P{}", self.next_player_number));
            client.slot = Some(slot);
            self.next_player_number += 1;
        }

        info!(
            "Client {} ({}) joined from {} as {}",
            client_id,
            client.name,
            addr,
            client.player_id.as_deref().unwrap_or("spectator")
        );
        self.clients.insert(client_id, client);
        Some(client_id)
    }

    /// Removes a client and hands it back so the caller can drop its snake.
    pub fn leave(&mut self, client_id: u32) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        info!("Client {} ({}) left", client.id, client.name);
        Some(client)
    }

    fn lowest_free_slot(&self) -> usize {
        let held: HashSet<usize> = self.clients.values().filter_map(|c| c.slot).collect();
        (0..).find(|slot| !held.contains(slot)).unwrap_or(0)
    }

    /// Forgets id numbering between matches, keeping ids still held.
    pub fn reset_player_numbers(&mut self) {
        self.next_player_number = self
            .clients
            .values()
            .filter_map(|client| {
                client
                    .player_id
                    .as_deref()?
                    .strip_prefix('P')?
                    .parse::<usize>()
                    .ok()
            })
            .max()
            .map_or(1, |n| n + 1);
    }

    pub fn client(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn player_id(&self, client_id: u32) -> Option<&str> {
        self.clients
            .get(&client_id)
            .and_then(|client| client.player_id.as_deref())
    }

    /// Display name of the client controlling `player_id`.
    pub fn name_for_player(&self, player_id: &str) -> Option<&str> {
        self.clients
            .values()
            .find(|client| client.player_id.as_deref() == Some(player_id))
            .map(|client| client.name.as_str())
    }

    /// Seated players as `(player_id, slot)`, in slot order.
    pub fn seated_players(&self) -> Vec<(String, usize)> {
        let mut seated: Vec<(String, usize)> = self
            .clients
            .values()
            .filter_map(|client| Some((client.player_id.clone()?, client.slot?)))
            .collect();
        seated.sort_by_key(|(_, slot)| *slot);
        seated
    }

    fn seated_count(&self) -> usize {
        self.clients
            .values()
            .filter(|client| !client.is_spectator())
            .count()
    }

    /// Roster in join order.
    pub fn roster(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self.clients.values().map(Client::info).collect();
        players.sort_by_key(|player| player.client_id);
        players
    }

    /// Refreshes the activity timestamp for any packet, not just inputs.
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    pub fn add_input(&mut self, client_id: u32, input: InputState) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.add_input(input);
            true
        } else {
            false
        }
    }

    /// All unapplied inputs across clients, oldest timestamp first.
    ///
    /// Ties keep per-client sequence order.
    pub fn get_chronological_inputs(&self) -> Vec<(u32, InputState)> {
        let mut all_inputs: Vec<(u32, InputState)> = Vec::new();

        for (client_id, client) in &self.clients {
            for input in &client.pending_inputs {
                if input.sequence > client.last_processed_input {
                    all_inputs.push((*client_id, input.clone()));
                }
            }
        }

        all_inputs.sort_by_key(|(client_id, input)| (input.timestamp, *client_id, input.sequence));
        all_inputs
    }

    pub fn mark_input_processed(&mut self, client_id: u32, sequence: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_processed_input = client.last_processed_input.max(sequence);
        }
    }

    pub fn cleanup_processed_inputs(&mut self) {
        for client in self.clients.values_mut() {
            let last = client.last_processed_input;
            client.pending_inputs.retain(|input| input.sequence > last);
        }
    }

    pub fn get_last_processed_inputs(&self) -> HashMap<u32, u32> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.last_processed_input))
            .collect()
    }

    /// Drops clients silent for longer than `timeout` and returns them.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<Client> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|client_id| self.leave(client_id))
            .collect()
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
