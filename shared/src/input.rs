//! Key identifiers to direction intents and actions.

use crate::vector::Vector;
use std::collections::HashMap;

/// Raw key that fires a projectile in the combat ruleset.
pub const FIRE_KEY: &str = " ";

/// Non-movement inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fire,
}

impl Action {
    pub fn from_key(key: &str) -> Option<Action> {
        match key {
            FIRE_KEY | "Space" | "space" | "fire" => Some(Action::Fire),
            _ => None,
        }
    }
}

/// Per-snake mapping from raw key identifier to direction name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: HashMap<String, String>,
}

impl Default for KeyMap {
    /// Arrow keys plus WASD in both cases.
    fn default() -> Self {
        let mut map = KeyMap::empty();
        for (key, dir) in [
            ("ArrowUp", "up"),
            ("ArrowDown", "down"),
            ("ArrowLeft", "left"),
            ("ArrowRight", "right"),
            ("w", "up"),
            ("W", "up"),
            ("s", "down"),
            ("S", "down"),
            ("a", "left"),
            ("A", "left"),
            ("d", "right"),
            ("D", "right"),
        ] {
            map.bind(key, dir);
        }
        map
    }
}

impl KeyMap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: &str, direction: &str) {
        self.bindings.insert(key.to_string(), direction.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn direction_name(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(String::as_str)
    }

    pub fn direction_for(&self, key: &str) -> Option<Vector> {
        self.direction_name(key).and_then(Vector::from_name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
