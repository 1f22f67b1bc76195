use crate::config::SpawnPoint;
use crate::input::KeyMap;
use crate::snapshot::SnakeSnapshot;
use crate::timer::TimerHandle;
use crate::vector::Vector;
use rand::Rng;
use std::collections::VecDeque;

/// Body and accent colors derived from a palette hue.
pub fn colors_from_hue(hue: u16) -> (String, String) {
    (
        format!("hsl({}, 70%, 45%)", hue),
        format!("hsl({}, 70%, 35%)", hue),
    )
}

pub fn random_colors() -> (String, String) {
    colors_from_hue(rand::thread_rng().gen_range(0..360))
}

/// Construction parameters for [`Snake::new`].
#[derive(Debug, Clone)]
pub struct SnakeOptions {
    pub id: String,
    pub start_pos: Vector,
    pub dir: Vector,
    pub initial_length: u32,
    pub colors: Option<(String, String)>,
    pub key_map: Option<KeyMap>,
    pub ammo: u32,
    pub armor: u32,
}

impl SnakeOptions {
    pub fn new(id: impl Into<String>, start_pos: Vector, dir: Vector) -> Self {
        Self {
            id: id.into(),
            start_pos,
            dir,
            initial_length: 3,
            colors: None,
            key_map: None,
            ammo: 0,
            armor: 0,
        }
    }

    pub fn with_length(mut self, initial_length: u32) -> Self {
        self.initial_length = initial_length;
        self
    }

    pub fn with_colors(mut self, color: impl Into<String>, alternate: impl Into<String>) -> Self {
        self.colors = Some((color.into(), alternate.into()));
        self
    }

    pub fn with_key_map(mut self, key_map: KeyMap) -> Self {
        self.key_map = Some(key_map);
        self
    }

    pub fn with_resources(mut self, ammo: u32, armor: u32) -> Self {
        self.ammo = ammo;
        self.armor = armor;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Snake {
    pub id: String,
    body: VecDeque<Vector>,
    pub dir: Vector,
    /// Direction of the last executed step; reversals are checked against this
    pub last_move_dir: Vector,
    pub pending_grow: u32,
    pub alive: bool,
    pub respawning: bool,
    pub longest_length: u32,
    pub color: String,
    pub alternate_color: String,
    pub key_map: KeyMap,
    pub ammo: u32,
    pub armor: u32,
    pub respawn_timer: Option<TimerHandle>,
}

impl Snake {
    /// Lays the body out behind `start_pos`, opposite to `dir`.
    pub fn new(opts: SnakeOptions) -> Self {
        let length = opts.initial_length.max(1) as i32;
        let body: VecDeque<Vector> = (0..length)
            .map(|i| opts.start_pos - opts.dir.scale(i))
            .collect();
        let (color, alternate_color) = opts.colors.unwrap_or_else(random_colors);

        Self {
            id: opts.id,
            longest_length: body.len() as u32,
            body,
            dir: opts.dir,
            last_move_dir: opts.dir,
            pending_grow: 0,
            alive: true,
            respawning: false,
            color,
            alternate_color,
            key_map: opts.key_map.unwrap_or_default(),
            ammo: opts.ammo,
            armor: opts.armor,
            respawn_timer: None,
        }
    }

    pub fn head(&self) -> Option<Vector> {
        self.body.front().copied()
    }

    pub fn body(&self) -> &VecDeque<Vector> {
        &self.body
    }

    /// Replaces the body wholesale. Used for scripted setups.
    pub fn set_body(&mut self, cells: impl IntoIterator<Item = Vector>) {
        self.body = cells.into_iter().collect();
        self.longest_length = self.longest_length.max(self.len());
    }

    pub fn len(&self) -> u32 {
        self.body.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.longest_length
    }

    pub fn set_direction(&mut self, new_dir: Vector) {
        if !self.alive || !new_dir.is_cardinal() {
            return;
        }
        if self.last_move_dir.is_opposite(new_dir) {
            return;
        }
        self.dir = new_dir;
    }

    pub fn set_direction_from_name(&mut self, name: &str) {
        if let Some(dir) = Vector::from_name(name) {
            self.set_direction(dir);
        }
    }

    /// Advances one cell. Returns the new head, or `None` when dead.
    pub fn step(&mut self) -> Option<Vector> {
        if !self.alive {
            return None;
        }
        let new_head = self.head()? + self.dir;
        self.body.push_front(new_head);

        if self.pending_grow > 0 {
            self.pending_grow -= 1;
        } else {
            self.body.pop_back();
        }

        self.last_move_dir = self.dir;
        self.longest_length = self.longest_length.max(self.len());
        Some(new_head)
    }

    pub fn grow(&mut self, n: u32) {
        self.pending_grow += n;
    }

    pub fn check_border_death(&mut self, cols: i32, rows: i32) -> bool {
        match self.head() {
            Some(head) if !head.in_bounds(cols, rows) => {
                self.alive = false;
                true
            }
            _ => false,
        }
    }

    pub fn hits_self(&self) -> bool {
        match self.head() {
            Some(head) => self.body.iter().skip(1).any(|&cell| cell == head),
            None => false,
        }
    }

    /// True when this head sits on any non-head segment of `other`.
    pub fn head_hits_body_of(&self, other: &Snake) -> bool {
        match self.head() {
            Some(head) => other.body.iter().skip(1).any(|&cell| cell == head),
            None => false,
        }
    }

    pub fn occupies(&self, pos: Vector) -> bool {
        self.body.contains(&pos)
    }

    /// Enters the respawn window: dead, bodiless, score kept.
    ///
    /// Returns the length the snake had when it died.
    pub fn begin_respawn(&mut self) -> u32 {
        let length = self.len();
        self.longest_length = self.longest_length.max(length);
        self.alive = false;
        self.respawning = true;
        self.body.clear();
        length
    }

    /// Comes back as a single cell that regrows to `initial_length`.
    pub fn respawn(&mut self, spawn: &SpawnPoint, initial_length: u32) {
        self.body.clear();
        self.body.push_back(spawn.start_pos);
        self.dir = spawn.dir;
        self.last_move_dir = spawn.dir;
        self.pending_grow = initial_length.saturating_sub(1);
        self.alive = true;
        self.respawning = false;
        self.respawn_timer = None;
    }

    /// Drops the tail segment. Returns false when only the head is left.
    pub fn shrink(&mut self) -> bool {
        if self.body.len() <= 1 {
            return false;
        }
        self.body.pop_back();
        true
    }

    pub fn take_ammo(&mut self) -> bool {
        if self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        true
    }

    pub fn add_ammo(&mut self, n: u32) {
        self.ammo += n;
    }

    pub fn add_armor(&mut self, n: u32) {
        self.armor += n;
    }

    pub fn to_snapshot(&self) -> SnakeSnapshot {
        SnakeSnapshot {
            id: self.id.clone(),
            color: self.color.clone(),
            alternate_color: self.alternate_color.clone(),
            head: self.head(),
            dir: self.dir,
            length: self.len(),
            alive: self.alive,
            respawning: self.respawning,
            score: self.longest_length,
            pending_grow: self.pending_grow,
            ammo: self.ammo,
            armor: self.armor,
        }
    }

    /// Builds a local snake for an id first seen in a snapshot.
    ///
    /// Returns `None` while the remote snake has no position yet.
    pub fn from_snapshot(snapshot: &SnakeSnapshot) -> Option<Snake> {
        if snapshot.respawning {
            return None;
        }
        let head = snapshot.head?;

        let mut opts = SnakeOptions::new(snapshot.id.clone(), head, snapshot.dir).with_length(1);
        if !snapshot.color.is_empty() {
            opts = opts.with_colors(
                snapshot.color.clone(),
                snapshot.alternate_color.clone(),
            );
        }

        let mut snake = Snake::new(opts);
        snake.pad_to(snapshot.length);
        snake.alive = snapshot.alive;
        snake.longest_length = snapshot.score;
        snake.pending_grow = snapshot.pending_grow;
        snake.ammo = snapshot.ammo;
        snake.armor = snapshot.armor;
        Some(snake)
    }

    /// Merges an authoritative snapshot into this snake.
    ///
    /// The snapshot only carries the head and a length, so the body is
    /// rebuilt from local history: the new head is prepended, then the tail
    /// is cut or stretched until the length matches.
    pub fn apply_snapshot(&mut self, snapshot: &SnakeSnapshot) {
        if !snapshot.color.is_empty() {
            self.color = snapshot.color.clone();
        }
        if !snapshot.alternate_color.is_empty() {
            self.alternate_color = snapshot.alternate_color.clone();
        }
        self.respawning = snapshot.respawning;

        let head = match snapshot.head {
            Some(head) if !snapshot.respawning => head,
            _ => {
                // No authoritative position yet
                self.body.clear();
                self.alive = snapshot.alive && snapshot.head.is_some();
                self.longest_length = snapshot.score;
                return;
            }
        };

        let head_moved = self.head() != Some(head);
        if self.dir != snapshot.dir {
            self.dir = snapshot.dir;
        }

        if !self.alive && snapshot.alive {
            self.body.clear();
            self.body.push_back(head);
            self.last_move_dir = snapshot.dir;
        } else if head_moved && snapshot.alive {
            self.body.push_front(head);
            self.body.truncate(snapshot.length.max(1) as usize);
            self.pad_to(snapshot.length);
            self.last_move_dir = snapshot.dir;
        }

        self.alive = snapshot.alive;
        self.longest_length = snapshot.score;
        self.pending_grow = snapshot.pending_grow;
        self.ammo = snapshot.ammo;
        self.armor = snapshot.armor;
    }

    /// Duplicates the last segment until the body is `length` long.
    fn pad_to(&mut self, length: u32) {
        while self.body.len() < length as usize {
            match self.body.back().copied() {
                Some(tail) => self.body.push_back(tail),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake_at(x: i32, y: i32, dir: Vector) -> Snake {
        Snake::new(SnakeOptions::new("p1", Vector::new(x, y), dir).with_colors("red", "darkred"))
    }

    #[test]
    fn test_snake_creation() {
        let snake = snake_at(5, 5, Vector::RIGHT);
        let body: Vec<Vector> = snake.body().iter().copied().collect();

        assert_eq!(
            body,
            vec![Vector::new(5, 5), Vector::new(4, 5), Vector::new(3, 5)]
        );
        assert_eq!(snake.head(), Some(Vector::new(5, 5)));
        assert_eq!(snake.len(), 3);
        assert_eq!(snake.score(), 3);
        assert!(snake.alive);
        assert!(!snake.respawning);
        assert_eq!(snake.color, "red");
    }

    #[test]
    fn test_reverse_is_ignored() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.set_direction(Vector::LEFT);
        assert_eq!(snake.dir, Vector::RIGHT);

        snake.set_direction(Vector::UP);
        assert_eq!(snake.dir, Vector::UP);

        // Reversal is judged against the last executed move, not `dir`
        snake.set_direction(Vector::LEFT);
        assert_eq!(snake.dir, Vector::UP);

        snake.step();
        snake.set_direction(Vector::LEFT);
        assert_eq!(snake.dir, Vector::LEFT);
        snake.set_direction(Vector::DOWN);
        assert_eq!(snake.dir, Vector::LEFT);
    }

    #[test]
    fn test_set_direction_ignored_when_dead_or_invalid() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.set_direction(Vector::new(1, 1));
        assert_eq!(snake.dir, Vector::RIGHT);

        snake.set_direction_from_name("diagonal");
        assert_eq!(snake.dir, Vector::RIGHT);

        snake.alive = false;
        snake.set_direction(Vector::UP);
        assert_eq!(snake.dir, Vector::RIGHT);
    }

    #[test]
    fn test_step_without_growth_keeps_length() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        let head = snake.step();

        assert_eq!(head, Some(Vector::new(6, 5)));
        assert_eq!(snake.len(), 3);
        assert_eq!(snake.last_move_dir, Vector::RIGHT);
    }

    #[test]
    fn test_step_with_growth() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.grow(2);

        snake.step();
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.pending_grow, 1);

        snake.step();
        snake.step();
        assert_eq!(snake.len(), 5);
        assert_eq!(snake.pending_grow, 0);
        assert_eq!(snake.score(), 5);
    }

    #[test]
    fn test_dead_snake_does_not_move() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.alive = false;
        assert_eq!(snake.step(), None);
        assert_eq!(snake.head(), Some(Vector::new(5, 5)));
    }

    #[test]
    fn test_border_death() {
        let mut snake = snake_at(9, 2, Vector::RIGHT);
        assert!(!snake.check_border_death(10, 10));

        snake.step();
        assert!(snake.check_border_death(10, 10));
        assert!(!snake.alive);
    }

    #[test]
    fn test_self_collision() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        assert!(!snake.hits_self());

        snake.set_body([
            Vector::new(5, 5),
            Vector::new(5, 6),
            Vector::new(4, 6),
            Vector::new(4, 5),
            Vector::new(5, 5),
        ]);
        assert!(snake.hits_self());
    }

    #[test]
    fn test_head_hits_other_body() {
        let a = snake_at(5, 5, Vector::RIGHT);
        let mut b = Snake::new(SnakeOptions::new("p2", Vector::new(5, 3), Vector::DOWN));

        // b: (5,3),(5,2),(5,1) - no contact
        assert!(!a.head_hits_body_of(&b));

        b.set_body([Vector::new(6, 5), Vector::new(5, 5), Vector::new(4, 5)]);
        assert!(a.head_hits_body_of(&b));

        // Heads on the same cell are not a body hit
        b.set_body([Vector::new(5, 5), Vector::new(5, 4)]);
        assert!(!a.head_hits_body_of(&b));
    }

    #[test]
    fn test_respawn_cycle_keeps_score() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.grow(2);
        snake.step();
        snake.step();

        assert_eq!(snake.begin_respawn(), 5);
        assert!(!snake.alive);
        assert!(snake.respawning);
        assert!(snake.is_empty());
        assert_eq!(snake.step(), None);

        let spawn = SpawnPoint::new(Vector::new(25, 5), Vector::DOWN);
        snake.respawn(&spawn, 3);

        assert!(snake.alive);
        assert!(!snake.respawning);
        assert_eq!(snake.head(), Some(Vector::new(25, 5)));
        assert_eq!(snake.len(), 1);
        assert_eq!(snake.pending_grow, 2);
        assert_eq!(snake.dir, Vector::DOWN);
        assert_eq!(snake.score(), 5);
        assert_eq!(snake.color, "red");
    }

    #[test]
    fn test_shrink_and_ammo() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        assert!(snake.shrink());
        assert!(snake.shrink());
        assert!(!snake.shrink());
        assert_eq!(snake.len(), 1);

        assert!(!snake.take_ammo());
        snake.add_ammo(1);
        assert!(snake.take_ammo());
        assert_eq!(snake.ammo, 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.grow(1);
        let snapshot = snake.to_snapshot();

        assert_eq!(snapshot.head, Some(Vector::new(5, 5)));
        assert_eq!(snapshot.length, 3);
        assert_eq!(snapshot.pending_grow, 1);

        let copy = Snake::from_snapshot(&snapshot).unwrap();
        assert_eq!(copy.to_snapshot(), snapshot);
        assert_eq!(copy.len(), 3);
    }

    #[test]
    fn test_from_snapshot_skips_respawning() {
        let mut snake = snake_at(5, 5, Vector::RIGHT);
        snake.begin_respawn();

        assert!(Snake::from_snapshot(&snake.to_snapshot()).is_none());
    }

    #[test]
    fn test_apply_snapshot_moved_head() {
        let mut local = snake_at(5, 5, Vector::RIGHT);
        let mut remote = local.clone();
        remote.grow(1);
        remote.step();
        remote.set_direction(Vector::DOWN);
        remote.step();

        local.apply_snapshot(&remote.to_snapshot());

        // Only the new head is known; one step was skipped
        assert_eq!(local.head(), Some(Vector::new(6, 6)));
        assert_eq!(local.len(), 4);
        assert_eq!(local.dir, Vector::DOWN);
        assert_eq!(local.last_move_dir, Vector::DOWN);
        assert_eq!(local.score(), 4);
    }

    #[test]
    fn test_apply_snapshot_pads_short_body() {
        let mut local = snake_at(5, 5, Vector::RIGHT);
        local.set_body([Vector::new(5, 5)]);

        let mut snapshot = local.to_snapshot();
        snapshot.head = Some(Vector::new(6, 5));
        snapshot.length = 4;
        local.apply_snapshot(&snapshot);

        let body: Vec<Vector> = local.body().iter().copied().collect();
        assert_eq!(
            body,
            vec![
                Vector::new(6, 5),
                Vector::new(5, 5),
                Vector::new(5, 5),
                Vector::new(5, 5)
            ]
        );
    }

    #[test]
    fn test_apply_snapshot_respawning_clears_body() {
        let mut local = snake_at(5, 5, Vector::RIGHT);
        let mut remote = local.clone();
        remote.begin_respawn();

        local.apply_snapshot(&remote.to_snapshot());
        assert!(local.is_empty());
        assert!(!local.alive);
        assert!(local.respawning);
        assert_eq!(local.score(), 3);
    }

    #[test]
    fn test_apply_snapshot_revival() {
        let mut local = snake_at(5, 5, Vector::RIGHT);
        local.begin_respawn();

        let mut remote = local.clone();
        remote.respawn(&SpawnPoint::new(Vector::new(8, 12), Vector::RIGHT), 3);
        local.apply_snapshot(&remote.to_snapshot());

        assert!(local.alive);
        assert!(!local.respawning);
        assert_eq!(local.head(), Some(Vector::new(8, 12)));
        assert_eq!(local.len(), 1);
        assert_eq!(local.pending_grow, 2);
    }

    #[test]
    fn test_apply_snapshot_keeps_colors_when_empty() {
        let mut local = snake_at(5, 5, Vector::RIGHT);
        let mut snapshot = local.to_snapshot();
        snapshot.color = String::new();
        snapshot.alternate_color = "black".into();

        local.apply_snapshot(&snapshot);
        assert_eq!(local.color, "red");
        assert_eq!(local.alternate_color, "black");
    }

    #[test]
    fn test_colors_from_hue() {
        let (color, alternate) = colors_from_hue(120);
        assert_eq!(color, "hsl(120, 70%, 45%)");
        assert_eq!(alternate, "hsl(120, 70%, 35%)");
    }
}
