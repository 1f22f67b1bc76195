use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer cell coordinate on the game grid.
///
/// Also doubles as a unit direction. Positive x is right, positive y is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const UP: Vector = Vector { x: 0, y: -1 };
    pub const DOWN: Vector = Vector { x: 0, y: 1 };
    pub const LEFT: Vector = Vector { x: -1, y: 0 };
    pub const RIGHT: Vector = Vector { x: 1, y: 0 };
    pub const ZERO: Vector = Vector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    ///Returns the vector multiplied by a scalar.
    pub fn scale(self, scalar: i32) -> Vector {
        Vector {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// True when `other` points exactly the other way.
    pub fn is_opposite(self, other: Vector) -> bool {
        self.x + other.x == 0 && self.y + other.y == 0
    }

    /// True for the four unit directions.
    pub fn is_cardinal(self) -> bool {
        self.x.abs() + self.y.abs() == 1
    }

    pub fn in_bounds(self, cols: i32, rows: i32) -> bool {
        self.x >= 0 && self.x < cols && self.y >= 0 && self.y < rows
    }

    /// Stable `"x,y"` key.
    pub fn key(self) -> String {
        self.to_string()
    }

    /// Maps a direction name to its unit vector.
    ///
    /// Unknown names yield `None`, which callers treat as a no-op.
    pub fn from_name(name: &str) -> Option<Vector> {
        match name {
            "up" => Some(Vector::UP),
            "down" => Some(Vector::DOWN),
            "left" => Some(Vector::LEFT),
            "right" => Some(Vector::RIGHT),
            _ => None,
        }
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            Vector::UP => Some("up"),
            Vector::DOWN => Some("down"),
            Vector::LEFT => Some("left"),
            Vector::RIGHT => Some("right"),
            _ => None,
        }
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}
