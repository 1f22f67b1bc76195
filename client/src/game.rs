use log::{debug, warn};
use shared::{Action, Game, GameConfig, GameSnapshot, InputState, PlayerInfo};
use std::collections::HashMap;

/// Follower-side view of a match.
///
/// The local [`Game`] never ticks on its own. It is rebuilt from host
/// snapshots, with our own unacknowledged turns replayed on top so the
/// snake answers the keyboard before the host confirms it.
pub struct ClientGameState {
    pub game: Game,
    pub player_id: Option<String>,
    pub input_history: Vec<InputState>,
    pub last_confirmed_tick: Option<u32>,
    pub roster: Vec<PlayerInfo>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            game: Game::new(GameConfig::default()),
            player_id: None,
            input_history: Vec::new(),
            last_confirmed_tick: None,
            roster: Vec::new(),
        }
    }

    /// Resets the local board for a new match using the host's rules.
    pub fn start(&mut self, config: GameConfig) {
        self.game = Game::new(config);
        self.game.init();
        self.input_history.clear();
        self.last_confirmed_tick = None;
    }

    /// Merges an authoritative snapshot. Returns false for stale ticks and
    /// for snapshots that fail validation.
    pub fn apply_server_state(
        &mut self,
        tick: u32,
        snapshot: &GameSnapshot,
        last_processed_input: &HashMap<u32, u32>,
        client_id: Option<u32>,
    ) -> bool {
        if let Some(last) = self.last_confirmed_tick {
            if tick <= last {
                debug!("Dropping stale snapshot {} (have {})", tick, last);
                return false;
            }
        }
        if let Err(e) = snapshot.validate() {
            warn!("Rejecting snapshot {}: {}", tick, e);
            return false;
        }

        self.game.apply_network_state(snapshot);
        self.last_confirmed_tick = Some(tick);

        if let Some(client_id) = client_id {
            self.perform_reconciliation(client_id, last_processed_input);
        }
        true
    }

    /// Drops acknowledged inputs and replays the rest on our snake.
    fn perform_reconciliation(&mut self, client_id: u32, last_processed_input: &HashMap<u32, u32>) {
        if let Some(&last_processed_seq) = last_processed_input.get(&client_id) {
            self.input_history
                .retain(|input| input.sequence > last_processed_seq);
        }

        let Some(player_id) = self.player_id.as_deref() else {
            return;
        };
        for input in &self.input_history {
            if Action::from_key(&input.key).is_none() {
                self.game.handle_key_press(&input.key, Some(player_id));
            }
        }
    }

    /// Applies our own turn right away. Firing waits for the host.
    pub fn apply_prediction(&mut self, input: &InputState) {
        self.input_history.push(input.clone());

        if Action::from_key(&input.key).is_some() {
            return;
        }
        if let Some(player_id) = self.player_id.as_deref() {
            self.game.handle_key_press(&input.key, Some(player_id));
        }
    }

    fn display_name<'a>(&'a self, player_id: &'a str) -> &'a str {
        self.roster
            .iter()
            .find(|player| player.player_id.as_deref() == Some(player_id))
            .map(|player| player.name.as_str())
            .unwrap_or(player_id)
    }

    /// `Time: Ns | name: score | ...`
    pub fn status_line(&self) -> String {
        let view = self.game.state();
        let mut status = format!("Time: {}s", view.time_remaining_secs());
        for snake in view.snakes {
            status.push_str(&format!(
                " | {}: {}",
                self.display_name(&snake.id),
                snake.score()
            ));
        }
        status
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
