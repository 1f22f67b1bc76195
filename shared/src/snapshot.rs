//! Wire representation of the simulation.
//!
//! A snapshot is lossy: snakes travel as head + length, never as a full
//! body. Followers rebuild bodies through [`crate::Snake::apply_snapshot`].
//!
//! Decoding is strict about shape. Numbers must be integers, pickup types
//! must be known and directions must be unit steps. Optional fields fall
//! back to their defaults.

use crate::pickup::Pickup;
use crate::projectile::Projectile;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{entity} {id} has non-cardinal direction {dir}")]
    InvalidDirection {
        entity: &'static str,
        id: String,
        dir: Vector,
    },
    #[error("snake {0} appears more than once")]
    DuplicateSnake(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeSnapshot {
    pub id: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub alternate_color: String,
    /// `None` while the snake waits to respawn
    #[serde(default)]
    pub head: Option<Vector>,
    pub dir: Vector,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub alive: bool,
    #[serde(default)]
    pub respawning: bool,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub pending_grow: u32,
    #[serde(default)]
    pub ammo: u32,
    #[serde(default)]
    pub armor: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub snakes: Vec<SnakeSnapshot>,
    #[serde(default)]
    pub pickups: Vec<Pickup>,
    #[serde(default)]
    pub projectiles: Vec<Projectile>,
    #[serde(rename = "timeRemainingMS", default)]
    pub time_remaining_ms: Option<i64>,
}

impl GameSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: GameSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();

        for snake in &self.snakes {
            if !seen.insert(snake.id.as_str()) {
                return Err(SnapshotError::DuplicateSnake(snake.id.clone()));
            }
            if !snake.dir.is_cardinal() {
                return Err(SnapshotError::InvalidDirection {
                    entity: "snake",
                    id: snake.id.clone(),
                    dir: snake.dir,
                });
            }
        }

        for projectile in &self.projectiles {
            if !projectile.direction.is_cardinal() {
                return Err(SnapshotError::InvalidDirection {
                    entity: "projectile",
                    id: projectile.id.clone(),
                    dir: projectile.direction,
                });
            }
        }

        Ok(())
    }

    pub fn snake(&self, id: &str) -> Option<&SnakeSnapshot> {
        self.snakes.iter().find(|snake| snake.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pickup::PickupKind;

    fn snake_snapshot(id: &str) -> SnakeSnapshot {
        SnakeSnapshot {
            id: id.to_string(),
            color: "hsl(0, 70%, 45%)".to_string(),
            alternate_color: "hsl(0, 70%, 35%)".to_string(),
            head: Some(Vector::new(4, 4)),
            dir: Vector::RIGHT,
            length: 3,
            alive: true,
            respawning: false,
            score: 3,
            pending_grow: 0,
            ammo: 0,
            armor: 0,
        }
    }

    #[test]
    fn test_json_field_names() {
        let snapshot = GameSnapshot {
            snakes: vec![snake_snapshot("P1")],
            pickups: vec![Pickup::new("food-1", Vector::new(1, 2), PickupKind::Food)],
            projectiles: vec![],
            time_remaining_ms: Some(4_000),
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(value["timeRemainingMS"], 4_000);
        assert_eq!(value["snakes"][0]["alternateColor"], "hsl(0, 70%, 35%)");
        assert_eq!(value["snakes"][0]["pendingGrow"], 0);
        assert_eq!(value["pickups"][0]["type"], "food");

        let back = GameSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"snakes":[{"id":"P2","dir":{"x":0,"y":1}}],"pickups":[]}"#;
        let snapshot = GameSnapshot::from_json(json).unwrap();
        let snake = &snapshot.snakes[0];

        assert_eq!(snake.head, None);
        assert_eq!(snake.length, 0);
        assert!(!snake.alive);
        assert!(snake.color.is_empty());
        assert!(snapshot.projectiles.is_empty());
        assert_eq!(snapshot.time_remaining_ms, None);
    }

    #[test]
    fn test_null_head() {
        let json = r#"{"snakes":[{"id":"P1","head":null,"dir":{"x":1,"y":0},"respawning":true}]}"#;
        let snapshot = GameSnapshot::from_json(json).unwrap();
        assert!(snapshot.snakes[0].head.is_none());
        assert!(snapshot.snakes[0].respawning);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        // Non-integer length
        let json = r#"{"snakes":[{"id":"P1","dir":{"x":1,"y":0},"length":2.5}]}"#;
        assert!(matches!(
            GameSnapshot::from_json(json),
            Err(SnapshotError::Json(_))
        ));

        // Missing dir
        let json = r#"{"snakes":[{"id":"P1"}]}"#;
        assert!(GameSnapshot::from_json(json).is_err());

        // Unknown pickup type
        let json = r#"{"snakes":[],"pickups":[{"id":"x","position":{"x":0,"y":0},"type":"gold"}]}"#;
        assert!(GameSnapshot::from_json(json).is_err());

        // Non-numeric time
        let json = r#"{"snakes":[],"timeRemainingMS":"soon"}"#;
        assert!(GameSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_diagonal_direction() {
        let json = r#"{"snakes":[{"id":"P1","dir":{"x":1,"y":1}}]}"#;
        let err = GameSnapshot::from_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidDirection { .. }));
        assert!(err.to_string().contains("P1"));
    }

    #[test]
    fn test_rejects_duplicate_snakes() {
        let snapshot = GameSnapshot {
            snakes: vec![snake_snapshot("P1"), snake_snapshot("P1")],
            ..Default::default()
        };
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateSnake(id)) if id == "P1"
        ));
    }

    #[test]
    fn test_bincode_round_trip() {
        let snapshot = GameSnapshot {
            snakes: vec![snake_snapshot("P1")],
            pickups: vec![Pickup::new("food-1", Vector::new(0, 0), PickupKind::Special)],
            projectiles: vec![Projectile::new(
                "shot-1",
                "P1",
                Vector::new(5, 4),
                Vector::RIGHT,
                2,
            )],
            time_remaining_ms: Some(100),
        };

        let bytes = bincode::serialize(&snapshot).unwrap();
        let back: GameSnapshot = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.snake("P1").map(|s| s.length), Some(3));
    }
}
