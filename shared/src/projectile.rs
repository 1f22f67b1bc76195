use crate::snake::Snake;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

fn default_speed() -> i32 {
    1
}

fn default_alive() -> bool {
    true
}

/// A straight-line shot in the combat ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub id: String,
    pub owner_id: String,
    pub position: Vector,
    pub direction: Vector,
    /// Cells travelled per tick
    #[serde(default = "default_speed")]
    pub speed: i32,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

impl Projectile {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        position: Vector,
        direction: Vector,
        speed: i32,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            position,
            direction,
            speed,
            alive: true,
        }
    }

    /// Moves one cell along the direction of travel.
    pub fn advance_cell(&mut self) -> Vector {
        if self.alive {
            self.position = self.position + self.direction;
        }
        self.position
    }

    pub fn is_out_of_bounds(&self, cols: i32, rows: i32) -> bool {
        !self.position.in_bounds(cols, rows)
    }

    /// True when the current cell is on a living snake other than the shooter.
    pub fn hits(&self, snake: &Snake) -> bool {
        self.alive && snake.alive && snake.id != self.owner_id && snake.occupies(self.position)
    }
}
