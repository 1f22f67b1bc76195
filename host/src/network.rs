//! Host network layer: UDP plumbing, lobby handling and the tick loop

use crate::session::{Session, CLIENT_TIMEOUT};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    Game, GameConfig, GameObserver, GameView, InputState, Packet, TickOutcome, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// How often the respawn clock is advanced between ticks
const CLOCK_POLL: Duration = Duration::from_millis(10);

/// Messages sent from network tasks to the main host loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        player_id: Option<String>,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the host loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Logs match progress from inside the simulation.
struct LoggingObserver;

impl GameObserver for LoggingObserver {
    fn on_state_change(&mut self, view: &GameView<'_>) {
        if view.tick % 50 == 0 {
            let alive = view.snakes.iter().filter(|snake| snake.alive).count();
            debug!(
                "Tick {}: {}s left, {}/{} snakes alive, {} pickups",
                view.tick,
                view.time_remaining_secs(),
                alive,
                view.snakes.len(),
                view.pickups.len()
            );
        }
    }

    fn on_game_over(&mut self, view: &GameView<'_>) {
        for snake in view.snakes {
            info!("Final score {}: {}", snake.id, snake.score());
        }
    }
}

/// Authoritative host coordinating the lobby, networking and simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    session: Arc<RwLock<Session>>,
    game: Game,
    tick: u32,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: GameConfig,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Host listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let session = Session::new(config.player_limit, max_clients);
        let mut game = Game::new(config);
        game.set_observer(Box::new(LoggingObserver));

        Ok(Server {
            socket,
            session: Arc::new(RwLock::new(session)),
            game,
            tick: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 8192];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let session = Arc::clone(&self.session);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let session = session.read().await;
                            session.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops silent clients
    async fn spawn_timeout_checker(&self) {
        let session = Arc::clone(&self.session);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut session = session.write().await;
                    session.check_timeouts(CLIENT_TIMEOUT)
                };

                for client in timed_out {
                    let message = ServerMessage::ClientTimeout {
                        client_id: client.id,
                        player_id: client.player_id,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn broadcast_roster(&self) {
        let players = {
            let session = self.session.read().await;
            session.roster()
        };
        self.broadcast_packet(Packet::PlayerList { players }, None);
    }

    /// Drops a departed client's snake and tells everyone.
    async fn handle_departure(&mut self, client_id: u32, player_id: Option<String>) {
        if let Some(player_id) = player_id {
            self.game.remove_snake(&player_id);
        }
        debug!("Client {} departed", client_id);
        self.broadcast_roster().await;
    }

    /// Processes incoming packets and updates the lobby or the game
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let known_client = {
            let session = self.session.read().await;
            session.find_client_by_addr(addr)
        };
        if let Some(client_id) = known_client {
            self.session.write().await.touch(client_id);
        }

        match packet {
            Packet::Connect {
                client_version,
                name,
            } => {
                info!(
                    "Client connecting from {} (version: {}, name: {})",
                    addr, client_version, name
                );

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(response, addr);
                    return;
                }

                // Replace a stale connection from the same address
                if let Some(existing_id) = known_client {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let removed = self.session.write().await.leave(existing_id);
                    if let Some(client) = removed {
                        if let Some(player_id) = client.player_id {
                            self.game.remove_snake(&player_id);
                        }
                    }
                }

                let joined = {
                    let mut session = self.session.write().await;
                    session.join(addr, &name).map(|client_id| {
                        let client = session.client(client_id);
                        (
                            client_id,
                            client.and_then(|c| c.player_id.clone()),
                            client.and_then(|c| c.slot),
                        )
                    })
                };

                match joined {
                    Some((client_id, player_id, slot)) => {
                        // Late joiners get a snake straight away
                        if self.game.is_running() {
                            if let (Some(player_id), Some(slot)) = (&player_id, slot) {
                                self.game.add_player_snake(player_id, slot);
                            }
                        }
                        self.send_packet(
                            Packet::Connected {
                                client_id,
                                player_id,
                            },
                            addr,
                        );
                        if self.game.is_running() {
                            self.send_packet(
                                Packet::Started {
                                    config: self.game.config().clone(),
                                },
                                addr,
                            );
                        }
                        self.broadcast_roster().await;
                    }
                    None => {
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_packet(response, addr);
                    }
                }
            }

            Packet::Input {
                sequence,
                timestamp,
                key,
            } => {
                if let Some(client_id) = known_client {
                    let input = InputState {
                        sequence,
                        timestamp,
                        key,
                    };
                    self.session.write().await.add_input(client_id, input);
                }
            }

            Packet::Start => {
                if known_client.is_none() {
                    warn!("Start request from unknown peer {}", addr);
                    return;
                }
                if self.game.is_running() {
                    debug!("Ignoring start request, match already running");
                    return;
                }
                self.start_match().await;
            }

            // Already touched above
            Packet::Heartbeat { .. } => {}

            Packet::Disconnect => {
                if let Some(client_id) = known_client {
                    let removed = self.session.write().await.leave(client_id);
                    if let Some(client) = removed {
                        self.handle_departure(client.id, client.player_id).await;
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Resets the board, seats every player and starts ticking.
    async fn start_match(&mut self) {
        let seated = {
            let mut session = self.session.write().await;
            session.reset_player_numbers();
            session.seated_players()
        };

        self.game.init();
        for (player_id, slot) in &seated {
            self.game.add_player_snake(player_id, *slot);
        }
        for _ in 0..self.game.config().min_pickups {
            self.game.spawn_pickup(shared::PickupKind::Food);
        }
        self.game.start();

        info!("Match started with {} players", seated.len());
        self.broadcast_packet(
            Packet::Started {
                config: self.game.config().clone(),
            },
            None,
        );
        self.broadcast_game_state().await;
    }

    /// Applies queued inputs in timestamp order across all clients
    async fn process_inputs(&mut self) {
        let all_inputs = {
            let session = self.session.read().await;
            session.get_chronological_inputs()
        };
        if all_inputs.is_empty() {
            return;
        }

        let mut session = self.session.write().await;
        for (client_id, input) in all_inputs {
            // Spectators and departed players fall through as no-ops
            if let Some(player_id) = session.player_id(client_id) {
                if !self.game.handle_input(&input.key, Some(player_id)) {
                    debug!("Input {:?} from client {} ignored", input.key, client_id);
                }
            }
            session.mark_input_processed(client_id, input.sequence);
        }
        session.cleanup_processed_inputs();
    }

    /// Broadcasts the current snapshot to all connected clients
    async fn broadcast_game_state(&mut self) {
        let last_processed_input = {
            let session = self.session.read().await;
            if session.is_empty() {
                return;
            }
            session.get_last_processed_inputs()
        };

        self.tick = self.tick.wrapping_add(1);
        let packet = Packet::GameState {
            tick: self.tick,
            timestamp: now_millis(),
            last_processed_input,
            snapshot: self.game.network_state(),
        };

        self.broadcast_packet(packet, None);
    }

    async fn broadcast_game_over(&self) {
        let winner_id = self.game.winner().map(|snake| snake.id.clone());
        let winner_name = match &winner_id {
            Some(id) => {
                let session = self.session.read().await;
                session.name_for_player(id).map(str::to_string)
            }
            None => None,
        };

        info!(
            "Game over, winner: {}",
            winner_name
                .as_deref()
                .or(winner_id.as_deref())
                .unwrap_or("nobody")
        );
        self.broadcast_packet(
            Packet::GameOver {
                winner_id,
                winner_name,
            },
            None,
        );
    }

    /// One scheduler beat: inputs, simulation step, broadcast.
    async fn run_tick(&mut self) {
        self.process_inputs().await;
        if !self.game.is_running() {
            return;
        }

        match self.game.tick() {
            TickOutcome::Advanced => self.broadcast_game_state().await,
            TickOutcome::GameOver => {
                self.broadcast_game_state().await;
                self.broadcast_game_over().await;
            }
            TickOutcome::Idle => {}
        }
    }

    /// Main host loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(Duration::from_millis(self.game.config().tick_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut clock_interval = interval(CLOCK_POLL);
        let mut last_clock = Instant::now();

        info!("Host started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, player_id }) => {
                            info!("Client {} timed out", client_id);
                            self.handle_departure(client_id, player_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Host shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.run_tick().await;
                },

                _ = clock_interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_clock).as_millis() as u64;
                    if elapsed > 0 {
                        last_clock = now;
                        for id in self.game.advance_clock(elapsed) {
                            debug!("Snake {} is back", id);
                        }
                    }
                },
            }
        }

        Ok(())
    }
}

fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}
