use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Which rule set the tick loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    /// Grow by eating, longest snake wins.
    #[default]
    Classic,
    /// Classic plus projectiles, ammo and armor pickups.
    Combat,
}

/// A start cell and the direction a snake faces there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub start_pos: Vector,
    pub dir: Vector,
}

impl SpawnPoint {
    pub const fn new(start_pos: Vector, dir: Vector) -> Self {
        Self { start_pos, dir }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session-wide game settings, fixed once a match starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the grid in cells
    pub grid_cols: i32,
    /// Height of the grid in cells
    pub grid_rows: i32,
    pub tick_ms: u64,
    pub game_duration_ms: u64,
    pub initial_length: u32,
    pub respawn_delay_ms: u64,
    pub spawn_points: Vec<SpawnPoint>,
    /// HSL hues, one per spawn slot
    pub player_hues: Vec<u16>,
    /// Seats available before joiners become spectators
    pub player_limit: usize,
    /// Pickups kept on the board at the end of every tick
    pub min_pickups: usize,
    pub max_spawn_attempts: u32,
    /// Pickups landing on the outermost ring become `special`
    pub promote_edge_pickups: bool,
    pub ruleset: Ruleset,
    /// Cells per tick
    pub projectile_speed: i32,
    pub starting_ammo: u32,
    pub starting_armor: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_cols: 50,
            grid_rows: 40,
            tick_ms: 100,
            game_duration_ms: 90_000,
            initial_length: 3,
            respawn_delay_ms: 500,
            spawn_points: vec![
                SpawnPoint::new(Vector::new(8, 12), Vector::RIGHT),
                SpawnPoint::new(Vector::new(8, 28), Vector::RIGHT),
                SpawnPoint::new(Vector::new(42, 28), Vector::LEFT),
                SpawnPoint::new(Vector::new(42, 12), Vector::LEFT),
                SpawnPoint::new(Vector::new(25, 5), Vector::DOWN),
                SpawnPoint::new(Vector::new(25, 35), Vector::UP),
            ],
            player_hues: vec![0, 45, 120, 220],
            player_limit: 4,
            min_pickups: 3,
            max_spawn_attempts: 10_000,
            promote_edge_pickups: true,
            ruleset: Ruleset::Classic,
            projectile_speed: 2,
            starting_ammo: 3,
            starting_armor: 0,
        }
    }
}

impl GameConfig {
    /// Create a configuration with a custom grid size
    pub fn new(grid_cols: i32, grid_rows: i32) -> Self {
        Self {
            grid_cols,
            grid_rows,
            ..Default::default()
        }
    }

    pub fn combat() -> Self {
        Self {
            ruleset: Ruleset::Combat,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_cols <= 0 || self.grid_rows <= 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid_cols, self.grid_rows
            )));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be > 0".into()));
        }
        if self.initial_length == 0 {
            return Err(ConfigError::Invalid("initial_length must be > 0".into()));
        }
        if self.projectile_speed <= 0 {
            return Err(ConfigError::Invalid("projectile_speed must be > 0".into()));
        }
        for spawn in &self.spawn_points {
            if !spawn.start_pos.in_bounds(self.grid_cols, self.grid_rows) {
                return Err(ConfigError::Invalid(format!(
                    "spawn point {} is outside the grid",
                    spawn.start_pos
                )));
            }
            if !spawn.dir.is_cardinal() {
                return Err(ConfigError::Invalid(format!(
                    "spawn point {} has a non-cardinal direction",
                    spawn.start_pos
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.grid_cols, 50);
        assert_eq!(config.grid_rows, 40);
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.initial_length, 3);
        assert_eq!(config.spawn_points.len(), 6);
        assert_eq!(config.ruleset, Ruleset::Classic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_grid() {
        let config = GameConfig::new(20, 15);
        assert_eq!(config.grid_cols, 20);
        assert_eq!(config.grid_rows, 15);
        assert_eq!(config.respawn_delay_ms, 500);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            GameConfig::from_json_str(r#"{"tick_ms": 50, "ruleset": "combat"}"#).unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.ruleset, Ruleset::Combat);
        assert_eq!(config.grid_cols, 50);
        assert_eq!(config.min_pickups, 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GameConfig::default();
        config.tick_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        // Default spawn points sit outside a 10x10 grid
        let config = GameConfig::new(10, 10);
        assert!(config.validate().is_err());

        let err = GameConfig::from_json_str(r#"{"grid_cols": 0}"#).unwrap_err();
        assert!(err.to_string().contains("grid"));
    }

    #[test]
    fn test_malformed_json() {
        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GameConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
