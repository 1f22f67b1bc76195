use crate::game::ClientGameState;
use crate::input::{Command, InputManager};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{InputState, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    name: String,
    client_id: Option<u32>,
    connected: bool,
    auto_start: bool,

    game_state: ClientGameState,
    input_manager: InputManager,

    ping_ms: u64,
    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        name: &str,
        fake_ping_ms: u64,
        auto_start: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            name: name.to_string(),
            client_id: None,
            connected: false,
            auto_start,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(),
            ping_ms: 0,
            fake_ping_ms,
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to host as {}...", self.name);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            name: self.name.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
        match packet {
            Packet::Connected {
                client_id,
                player_id,
            } => {
                match &player_id {
                    Some(id) => info!("Connected! Client ID: {}, playing as {}", client_id, id),
                    None => info!("Connected! Client ID: {}, spectating", client_id),
                }
                self.client_id = Some(client_id);
                self.game_state.player_id = player_id;
                self.connected = true;

                if self.auto_start {
                    self.send_packet(&Packet::Start).await?;
                }
            }

            Packet::PlayerList { players } => {
                debug!("Roster now has {} peers", players.len());
                self.game_state.roster = players;
            }

            Packet::Started { config } => {
                info!(
                    "Match started: {}x{} grid, {:?} rules",
                    config.grid_cols, config.grid_rows, config.ruleset
                );
                self.game_state.start(config);
            }

            Packet::GameState {
                tick,
                timestamp,
                last_processed_input,
                snapshot,
            } => {
                let now = now_millis();
                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }

                self.game_state.apply_server_state(
                    tick,
                    &snapshot,
                    &last_processed_input,
                    self.client_id,
                );
            }

            Packet::GameOver {
                winner_id,
                winner_name,
            } => {
                println!("{}", self.game_state.status_line());
                match winner_name.or(winner_id) {
                    Some(winner) => println!("Game over! Winner: {}", winner),
                    None => println!("Game over! No winner"),
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }

        Ok(())
    }

    async fn send_input(&mut self, input: InputState) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected || self.client_id.is_none() {
            return Ok(());
        }

        let packet = Packet::Input {
            sequence: input.sequence,
            timestamp: input.timestamp,
            key: input.key.clone(),
        };

        self.send_packet(&packet).await?;
        self.game_state.apply_prediction(&input);

        Ok(())
    }

    /// Returns false once the user asked to leave.
    async fn handle_command(&mut self, command: Command) -> Result<bool, Box<dyn std::error::Error>> {
        match command {
            Command::Key(input) => self.send_input(input).await?,
            Command::Start => {
                if self.connected {
                    self.send_packet(&Packet::Start).await?;
                }
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut status_interval = interval(STATUS_INTERVAL);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        let mut buffer = [0u8; 8192];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                if let Err(e) = self.handle_packet(packet).await {
                                    error!("Error handling packet: {}", e);
                                }
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(command) = self.input_manager.parse_line(&line) {
                                match self.handle_command(command).await {
                                    Ok(true) => {}
                                    Ok(false) => break,
                                    Err(e) => error!("Error sending input: {}", e),
                                }
                            }
                        }
                        Ok(None) => stdin_open = false,
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            stdin_open = false;
                        }
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        let packet = Packet::Heartbeat { timestamp: now_millis() };
                        if let Err(e) = self.send_packet(&packet).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },

                _ = status_interval.tick() => {
                    if self.game_state.game.is_running() || self.game_state.last_confirmed_tick.is_some() {
                        println!("{} | ping {}ms", self.game_state.status_line(), self.ping_ms);
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Game, GameConfig, PlayerInfo};
    use std::collections::HashMap;
    use tokio_test::assert_ok;

    async fn client_with_host() -> (Client, UdpSocket) {
        let host = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = host.local_addr().unwrap().to_string();
        let client = assert_ok!(Client::new(&addr, "alice", 0, false).await);
        (client, host)
    }

    async fn recv_packet(host: &UdpSocket) -> Packet {
        let mut buffer = [0u8; 8192];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), host.recv_from(&mut buffer))
            .await
            .unwrap()
            .unwrap();
        deserialize(&buffer[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_connect_sends_name_and_version() {
        let (mut client, host) = client_with_host().await;
        assert_ok!(client.connect().await);

        match recv_packet(&host).await {
            Packet::Connect {
                client_version,
                name,
            } => {
                assert_eq!(client_version, PROTOCOL_VERSION);
                assert_eq!(name, "alice");
            }
            other => panic!("Unexpected packet {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connected_with_auto_start() {
        let host = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = host.local_addr().unwrap().to_string();
        let mut client = assert_ok!(Client::new(&addr, "alice", 0, true).await);

        assert_ok!(
            client
                .handle_packet(Packet::Connected {
                    client_id: 3,
                    player_id: Some("P1".to_string()),
                })
                .await
        );

        assert!(client.is_connected());
        assert_eq!(client.game_state().player_id.as_deref(), Some("P1"));
        assert!(matches!(recv_packet(&host).await, Packet::Start));
    }

    #[tokio::test]
    async fn test_inputs_wait_for_connection() {
        let (mut client, host) = client_with_host().await;
        let input = client.input_manager.next_input("ArrowUp");
        assert_ok!(client.send_input(input).await);
        assert!(client.game_state().input_history.is_empty());

        assert_ok!(
            client
                .handle_packet(Packet::Connected {
                    client_id: 1,
                    player_id: Some("P1".to_string()),
                })
                .await
        );
        let input = client.input_manager.next_input("ArrowUp");
        assert_ok!(client.send_input(input).await);

        match recv_packet(&host).await {
            Packet::Input { sequence, key, .. } => {
                assert_eq!(sequence, 2);
                assert_eq!(key, "ArrowUp");
            }
            other => panic!("Unexpected packet {:?}", other),
        }
        assert_eq!(client.game_state().input_history.len(), 1);
    }

    #[tokio::test]
    async fn test_follows_host_state() {
        let (mut client, _host) = client_with_host().await;

        let mut game = Game::with_seed(GameConfig::default(), 11);
        game.init();
        game.add_player_snake("P1", 0);
        game.start();
        game.tick();

        assert_ok!(
            client
                .handle_packet(Packet::PlayerList {
                    players: vec![PlayerInfo {
                        client_id: 1,
                        name: "alice".to_string(),
                        player_id: Some("P1".to_string()),
                        is_spectator: false,
                    }],
                })
                .await
        );
        assert_ok!(
            client
                .handle_packet(Packet::Started {
                    config: GameConfig::default(),
                })
                .await
        );
        assert_ok!(
            client
                .handle_packet(Packet::GameState {
                    tick: 1,
                    timestamp: now_millis(),
                    last_processed_input: HashMap::new(),
                    snapshot: game.network_state(),
                })
                .await
        );

        assert_eq!(client.game_state().last_confirmed_tick, Some(1));
        assert_eq!(client.game_state().game.network_state(), game.network_state());
        assert!(client.game_state().status_line().contains("alice: 3"));
    }

    #[tokio::test]
    async fn test_disconnected_clears_session() {
        let (mut client, _host) = client_with_host().await;
        assert_ok!(
            client
                .handle_packet(Packet::Connected {
                    client_id: 1,
                    player_id: None,
                })
                .await
        );
        assert_ok!(
            client
                .handle_packet(Packet::Disconnected {
                    reason: "Server full".to_string(),
                })
                .await
        );

        assert!(!client.is_connected());
        assert_eq!(client.client_id, None);
    }

    #[tokio::test]
    async fn test_quit_command_stops() {
        let (mut client, _host) = client_with_host().await;
        assert!(!assert_ok!(client.handle_command(Command::Quit).await));
        assert!(assert_ok!(client.handle_command(Command::Start).await));
    }
}
