use crate::config::{GameConfig, Ruleset, SpawnPoint};
use crate::ids::{IdGenerator, RandomIds, SequentialIds};
use crate::input::Action;
use crate::pickup::{Pickup, PickupKind};
use crate::projectile::Projectile;
use crate::snake::{colors_from_hue, random_colors, Snake, SnakeOptions};
use crate::snapshot::GameSnapshot;
use crate::timer::DeferredQueue;
use crate::vector::Vector;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

/// What a call to [`Game::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No countdown yet; `init` has not run.
    Idle,
    Advanced,
    GameOver,
}

/// Borrowed read view of the whole simulation.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    pub snakes: &'a [Snake],
    pub pickups: &'a [Pickup],
    pub projectiles: &'a [Projectile],
    pub time_remaining_ms: Option<i64>,
    pub is_game_over: bool,
    pub tick: u64,
}

impl GameView<'_> {
    /// Remaining time rounded to whole seconds.
    pub fn time_remaining_secs(&self) -> i64 {
        self.time_remaining_ms
            .map(|ms| (ms.max(0) + 500) / 1000)
            .unwrap_or(0)
    }
}

/// Receives simulation events. Both methods default to no-ops.
pub trait GameObserver: Send + Sync {
    fn on_state_change(&mut self, _view: &GameView<'_>) {}

    fn on_game_over(&mut self, _view: &GameView<'_>) {}
}

pub struct Game {
    config: GameConfig,
    snakes: Vec<Snake>,
    pickups: Vec<Pickup>,
    projectiles: Vec<Projectile>,
    time_remaining_ms: Option<i64>,
    running: bool,
    game_over: bool,
    tick_count: u64,
    clock_ms: u64,
    respawns: DeferredQueue<String>,
    rng: StdRng,
    ids: Box<dyn IdGenerator>,
    observer: Option<Box<dyn GameObserver>>,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::build(config, StdRng::from_entropy(), Box::new(RandomIds::new()))
    }

    /// Deterministic game: seeded placement and sequential ids.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::build(
            config,
            StdRng::seed_from_u64(seed),
            Box::new(SequentialIds::new()),
        )
    }

    fn build(config: GameConfig, rng: StdRng, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            config,
            snakes: Vec::new(),
            pickups: Vec::new(),
            projectiles: Vec::new(),
            time_remaining_ms: None,
            running: false,
            game_over: false,
            tick_count: 0,
            clock_ms: 0,
            respawns: DeferredQueue::new(),
            rng,
            ids,
            observer: None,
        }
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn set_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.snakes.iter().find(|snake| snake.id == id)
    }

    pub fn snake_mut(&mut self, id: &str) -> Option<&mut Snake> {
        self.snakes.iter_mut().find(|snake| snake.id == id)
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn time_remaining_ms(&self) -> Option<i64> {
        self.time_remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn pending_respawns(&self) -> usize {
        self.respawns.len()
    }

    /// Resets to an empty board with a full countdown. Safe to call repeatedly.
    pub fn init(&mut self) {
        self.stop();
        self.snakes.clear();
        self.pickups.clear();
        self.projectiles.clear();
        self.respawns.clear();
        self.time_remaining_ms = Some(self.config.game_duration_ms as i64);
        self.game_over = false;
        self.tick_count = 0;
        debug!(
            "Game initialised: {}x{} grid, {} ms",
            self.config.grid_cols, self.config.grid_rows, self.config.game_duration_ms
        );
    }

    /// Registers a snake, replacing any snake that already has the same id.
    pub fn add_snake(&mut self, opts: SnakeOptions) -> &mut Snake {
        let snake = Snake::new(opts);
        let index = match self.snakes.iter().position(|s| s.id == snake.id) {
            Some(index) => {
                self.respawns.cancel(&snake.id);
                self.snakes[index] = snake;
                index
            }
            None => {
                self.snakes.push(snake);
                self.snakes.len() - 1
            }
        };

        let snake = &mut self.snakes[index];
        info!(
            "Added snake {} at {} heading {}",
            snake.id,
            snake.head().unwrap_or_default(),
            snake.dir
        );
        snake
    }

    /// Adds a snake at spawn slot `slot` with the matching palette color.
    pub fn add_player_snake(&mut self, id: &str, slot: usize) -> &mut Snake {
        let spawn = match self.config.spawn_points.len() {
            0 => self.fallback_spawn(),
            n => self.config.spawn_points[slot % n],
        };
        let (color, alternate) = match self.config.player_hues.len() {
            0 => random_colors(),
            n => colors_from_hue(self.config.player_hues[slot % n]),
        };

        let mut opts = SnakeOptions::new(id, spawn.start_pos, spawn.dir)
            .with_length(self.config.initial_length)
            .with_colors(color, alternate);
        if self.config.ruleset == Ruleset::Combat {
            opts = opts.with_resources(self.config.starting_ammo, self.config.starting_armor);
        }
        self.add_snake(opts)
    }

    /// Removes the snake and any respawn it has pending.
    pub fn remove_snake(&mut self, id: &str) -> bool {
        self.respawns.cancel(&id.to_string());

        match self.snakes.iter().position(|snake| snake.id == id) {
            Some(index) => {
                self.snakes.remove(index);
                info!("Removed snake {}", id);
                true
            }
            None => false,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            info!("Game started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("Game stopped");
        }
    }

    /// Picks a cell not covered by any snake segment or pickup.
    ///
    /// Random probing first, then a row-major scan. The origin is returned
    /// only when every cell is taken.
    pub fn find_free_position(&mut self) -> Vector {
        let (cols, rows) = (self.config.grid_cols, self.config.grid_rows);
        if cols <= 0 || rows <= 0 {
            return Vector::ZERO;
        }

        let occupied: HashSet<Vector> = self
            .snakes
            .iter()
            .flat_map(|snake| snake.body().iter().copied())
            .chain(self.pickups.iter().map(|pickup| pickup.position))
            .collect();

        for _ in 0..self.config.max_spawn_attempts {
            let pos = Vector::new(self.rng.gen_range(0..cols), self.rng.gen_range(0..rows));
            if !occupied.contains(&pos) {
                return pos;
            }
        }

        for y in 0..rows {
            for x in 0..cols {
                let pos = Vector::new(x, y);
                if !occupied.contains(&pos) {
                    return pos;
                }
            }
        }

        Vector::ZERO
    }

    /// Spawns a pickup on a free cell. Edge cells may promote it to `special`.
    pub fn spawn_pickup(&mut self, kind: PickupKind) -> &Pickup {
        let position = self.find_free_position();
        let kind = if self.config.promote_edge_pickups && self.is_edge(position) {
            PickupKind::Special
        } else {
            kind
        };
        self.place_pickup(position, kind)
    }

    /// Places a pickup at an exact cell.
    pub fn place_pickup(&mut self, position: Vector, kind: PickupKind) -> &Pickup {
        let id = self.ids.next_id(kind.as_str());
        debug!("Spawned {} pickup {} at {}", kind.as_str(), id, position);
        self.pickups.push(Pickup::new(id, position, kind));
        &self.pickups[self.pickups.len() - 1]
    }

    fn is_edge(&self, pos: Vector) -> bool {
        pos.x == 0
            || pos.y == 0
            || pos.x == self.config.grid_cols - 1
            || pos.y == self.config.grid_rows - 1
    }

    /// Runs one simulation step.
    ///
    /// Phases: countdown, movement, collisions, projectiles, pickups, top-up,
    /// then the state-change notification. The countdown reaching zero ends
    /// the game before any other phase runs.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(remaining) = self.time_remaining_ms else {
            return TickOutcome::Idle;
        };
        if self.game_over {
            return TickOutcome::GameOver;
        }

        let remaining = remaining - self.config.tick_ms as i64;
        if remaining <= 0 {
            self.time_remaining_ms = Some(0);
            self.game_over = true;
            self.stop();
            info!("Time is up after {} ticks", self.tick_count);
            self.notify(|observer, view| observer.on_game_over(view));
            return TickOutcome::GameOver;
        }
        self.time_remaining_ms = Some(remaining);
        self.tick_count += 1;

        self.move_snakes();
        self.resolve_collisions();
        if self.config.ruleset == Ruleset::Combat {
            self.advance_projectiles();
        }
        self.consume_pickups();
        self.maintain_pickups();

        self.notify(|observer, view| observer.on_state_change(view));
        TickOutcome::Advanced
    }

    fn move_snakes(&mut self) {
        let (cols, rows) = (self.config.grid_cols, self.config.grid_rows);
        let mut off_grid = Vec::new();

        for snake in self.snakes.iter_mut().filter(|snake| snake.alive) {
            snake.step();
            if snake.check_border_death(cols, rows) {
                off_grid.push(snake.id.clone());
            }
        }

        for id in off_grid {
            debug!("Snake {} left the grid", id);
            self.respawn_snake(&id);
        }
    }

    /// Applies self, body and head-on deaths as one atomic batch.
    ///
    /// Every check reads the alive set as it stood when the phase began. A
    /// snake that bit itself still blocks others and still dies in a head-on
    /// group this tick.
    fn resolve_collisions(&mut self) {
        let alive: Vec<bool> = self
            .snakes
            .iter()
            .map(|snake| snake.alive && !snake.is_empty())
            .collect();
        let mut doomed = vec![false; self.snakes.len()];

        for (i, snake) in self.snakes.iter().enumerate() {
            if alive[i] && snake.hits_self() {
                doomed[i] = true;
            }
        }

        for (i, snake) in self.snakes.iter().enumerate() {
            if !alive[i] {
                continue;
            }
            let hit = self
                .snakes
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && alive[j] && snake.head_hits_body_of(other));
            if hit {
                doomed[i] = true;
            }
        }

        let mut heads: HashMap<Vector, Vec<usize>> = HashMap::new();
        for (i, snake) in self.snakes.iter().enumerate() {
            if let (true, Some(head)) = (alive[i], snake.head()) {
                heads.entry(head).or_default().push(i);
            }
        }
        for group in heads.values().filter(|group| group.len() > 1) {
            for &i in group {
                doomed[i] = true;
            }
        }

        let dead: Vec<String> = self
            .snakes
            .iter()
            .zip(doomed)
            .filter(|(_, doomed)| *doomed)
            .map(|(snake, _)| snake.id.clone())
            .collect();
        for id in dead {
            debug!("Snake {} collided", id);
            self.respawn_snake(&id);
        }
    }

    fn advance_projectiles(&mut self) {
        let (cols, rows) = (self.config.grid_cols, self.config.grid_rows);
        let mut hits = Vec::new();

        for projectile in self.projectiles.iter_mut().filter(|p| p.alive) {
            // Step 0 checks the cell the shot already sits on
            for step in 0..=projectile.speed.max(1) {
                if step > 0 {
                    projectile.advance_cell();
                }
                if projectile.is_out_of_bounds(cols, rows) {
                    projectile.alive = false;
                    break;
                }
                if let Some(target) = self.snakes.iter().find(|snake| projectile.hits(snake)) {
                    debug!("Projectile {} hit {}", projectile.id, target.id);
                    hits.push(target.id.clone());
                    projectile.alive = false;
                    break;
                }
            }
        }
        self.projectiles.retain(|projectile| projectile.alive);

        for id in hits {
            self.apply_hit(&id);
        }
    }

    /// Armor absorbs a hit; otherwise the target loses its tail. A lone head
    /// cannot shrink, so that snake dies instead.
    fn apply_hit(&mut self, id: &str) {
        let dies = match self.snakes.iter_mut().find(|snake| snake.id == id) {
            Some(target) if target.alive => {
                if target.armor > 0 {
                    target.armor -= 1;
                    false
                } else {
                    !target.shrink()
                }
            }
            _ => false,
        };

        if dies {
            self.respawn_snake(id);
        }
    }

    fn consume_pickups(&mut self) {
        let ruleset = self.config.ruleset;
        for snake in self.snakes.iter_mut().filter(|snake| snake.alive) {
            let Some(head) = snake.head() else {
                continue;
            };
            self.pickups.retain(|pickup| {
                if pickup.is_at(head) {
                    debug!("Snake {} ate {}", snake.id, pickup.id);
                    pickup.apply_to(snake, ruleset);
                    false
                } else {
                    true
                }
            });
        }
    }

    fn maintain_pickups(&mut self) {
        while self.pickups.len() < self.config.min_pickups {
            let kind = match self.config.ruleset {
                Ruleset::Classic => PickupKind::Food,
                Ruleset::Combat => *[
                    PickupKind::Food,
                    PickupKind::Food,
                    PickupKind::Ammo,
                    PickupKind::Armor,
                ]
                .choose(&mut self.rng)
                .unwrap_or(&PickupKind::Food),
            };
            self.spawn_pickup(kind);
        }
    }

    /// Kills the snake now and schedules its return after the respawn delay.
    pub fn respawn_snake(&mut self, id: &str) -> bool {
        let delay = self.config.respawn_delay_ms;
        let now = self.clock_ms;

        let Some(snake) = self.snakes.iter_mut().find(|snake| snake.id == id) else {
            return false;
        };
        let length = snake.begin_respawn();
        let handle = self.respawns.schedule(snake.id.clone(), now, delay);
        snake.respawn_timer = Some(handle);

        debug!(
            "Snake {} died at length {}, back in {} ms",
            id, length, delay
        );
        true
    }

    /// Advances the respawn clock and revives every snake that is due.
    ///
    /// Returns the ids that came back.
    pub fn advance_clock(&mut self, elapsed_ms: u64) -> Vec<String> {
        self.clock_ms = self.clock_ms.saturating_add(elapsed_ms);
        let initial_length = self.config.initial_length;
        let mut revived = Vec::new();

        for (handle, id) in self.respawns.drain_due(self.clock_ms) {
            let spawn = self.pick_spawn_point();
            let Some(snake) = self.snakes.iter_mut().find(|snake| snake.id == id) else {
                debug!("Dropping respawn for departed snake {}", id);
                continue;
            };
            if !snake.respawning || snake.respawn_timer != Some(handle) {
                continue;
            }

            snake.respawn(&spawn, initial_length);
            debug!("Snake {} respawned at {}", id, spawn.start_pos);
            revived.push(id);
        }

        revived
    }

    fn pick_spawn_point(&mut self) -> SpawnPoint {
        match self.config.spawn_points.choose(&mut self.rng) {
            Some(spawn) => *spawn,
            None => self.fallback_spawn(),
        }
    }

    fn fallback_spawn(&self) -> SpawnPoint {
        SpawnPoint::new(
            Vector::new(self.config.grid_cols / 2, self.config.grid_rows / 2),
            Vector::RIGHT,
        )
    }

    fn matches_player(snake: &Snake, player_id: Option<&str>) -> bool {
        player_id.map_or(true, |id| snake.id == id)
    }

    /// True when some alive snake for `player_id` has `key` bound.
    pub fn is_valid_input(&self, key: &str, player_id: Option<&str>) -> bool {
        self.snakes
            .iter()
            .filter(|snake| Self::matches_player(snake, player_id))
            .any(|snake| snake.alive && snake.key_map.contains(key))
    }

    /// Turns the first matching alive snake that knows `key`.
    ///
    /// Returns true when the key was recognised, even if the turn itself
    /// was a forbidden reversal.
    pub fn handle_key_press(&mut self, key: &str, player_id: Option<&str>) -> bool {
        for snake in self
            .snakes
            .iter_mut()
            .filter(|snake| Self::matches_player(snake, player_id))
        {
            if snake.alive && snake.key_map.contains(key) {
                if let Some(dir) = snake.key_map.direction_for(key) {
                    snake.set_direction(dir);
                }
                return true;
            }
        }
        false
    }

    pub fn handle_action(&mut self, action: Action, player_id: Option<&str>) -> bool {
        match action {
            Action::Fire => {
                let shooter = self
                    .snakes
                    .iter()
                    .find(|snake| snake.alive && Self::matches_player(snake, player_id))
                    .map(|snake| snake.id.clone());
                match shooter {
                    Some(id) => self.fire_projectile(&id).is_some(),
                    None => false,
                }
            }
        }
    }

    /// Routes a raw key to an action or a turn.
    pub fn handle_input(&mut self, key: &str, player_id: Option<&str>) -> bool {
        match Action::from_key(key) {
            Some(action) => self.handle_action(action, player_id),
            None => self.handle_key_press(key, player_id),
        }
    }

    /// Launches a shot one cell ahead of the snake's head.
    pub fn fire_projectile(&mut self, snake_id: &str) -> Option<&Projectile> {
        if self.config.ruleset != Ruleset::Combat {
            return None;
        }
        let speed = self.config.projectile_speed;

        let snake = self.snakes.iter_mut().find(|snake| snake.id == snake_id)?;
        if !snake.alive {
            return None;
        }
        let head = snake.head()?;
        if !snake.take_ammo() {
            return None;
        }
        let (position, direction) = (head + snake.dir, snake.dir);

        let id = self.ids.next_id("shot");
        debug!("Snake {} fired {} toward {}", snake_id, id, direction);
        self.projectiles
            .push(Projectile::new(id, snake_id, position, direction, speed));
        self.projectiles.last()
    }

    /// Highest score wins; ties go to the earliest snake.
    pub fn winner(&self) -> Option<&Snake> {
        let mut best: Option<&Snake> = None;
        for snake in &self.snakes {
            match best {
                Some(current) if snake.score() <= current.score() => {}
                _ => best = Some(snake),
            }
        }
        best
    }

    pub fn state(&self) -> GameView<'_> {
        GameView {
            snakes: &self.snakes,
            pickups: &self.pickups,
            projectiles: &self.projectiles,
            time_remaining_ms: self.time_remaining_ms,
            is_game_over: self.game_over,
            tick: self.tick_count,
        }
    }

    pub fn network_state(&self) -> GameSnapshot {
        GameSnapshot {
            snakes: self.snakes.iter().map(Snake::to_snapshot).collect(),
            pickups: self.pickups.clone(),
            projectiles: self.projectiles.clone(),
            time_remaining_ms: self.time_remaining_ms,
        }
    }

    /// Merges an authoritative snapshot into the local simulation.
    ///
    /// Known snakes are reconciled, new ones are created once they have a
    /// head, and snakes missing from the snapshot are dropped. Pickups and
    /// projectiles are replaced outright.
    pub fn apply_network_state(&mut self, snapshot: &GameSnapshot) {
        for remote in &snapshot.snakes {
            match self.snakes.iter().position(|snake| snake.id == remote.id) {
                Some(index) => self.snakes[index].apply_snapshot(remote),
                None => {
                    if let Some(snake) = Snake::from_snapshot(remote) {
                        debug!("Snake {} joined from snapshot", snake.id);
                        self.snakes.push(snake);
                    }
                }
            }
        }

        let present: HashSet<&str> = snapshot.snakes.iter().map(|s| s.id.as_str()).collect();
        let respawns = &mut self.respawns;
        self.snakes.retain(|snake| {
            let keep = present.contains(snake.id.as_str());
            if !keep {
                respawns.cancel(&snake.id);
                debug!("Snake {} left", snake.id);
            }
            keep
        });

        self.pickups = snapshot.pickups.clone();
        self.projectiles = snapshot.projectiles.clone();
        if let Some(remaining) = snapshot.time_remaining_ms {
            self.time_remaining_ms = Some(remaining);
        }
    }

    fn notify(&mut self, event: impl FnOnce(&mut dyn GameObserver, &GameView<'_>)) {
        if let Some(mut observer) = self.observer.take() {
            event(observer.as_mut(), &self.state());
            self.observer = Some(observer);
        }
    }
}
