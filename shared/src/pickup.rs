use crate::config::Ruleset;
use crate::snake::Snake;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// What a pickup does to the snake that eats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupKind {
    Food,
    Special,
    Ammo,
    Armor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickupEffect {
    pub grow: u32,
    pub ammo: u32,
    pub armor: u32,
}

impl PickupKind {
    /// Classic games grow by one for any pickup; combat uses the full table.
    pub fn effect(self, ruleset: Ruleset) -> PickupEffect {
        if ruleset == Ruleset::Classic {
            return PickupEffect {
                grow: 1,
                ..Default::default()
            };
        }
        match self {
            PickupKind::Food => PickupEffect {
                grow: 1,
                ..Default::default()
            },
            PickupKind::Special => PickupEffect {
                grow: 3,
                ..Default::default()
            },
            PickupKind::Ammo => PickupEffect {
                ammo: 3,
                ..Default::default()
            },
            PickupKind::Armor => PickupEffect {
                armor: 1,
                ..Default::default()
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PickupKind::Food => "food",
            PickupKind::Special => "special",
            PickupKind::Ammo => "ammo",
            PickupKind::Armor => "armor",
        }
    }

    pub fn from_name(name: &str) -> Option<PickupKind> {
        match name {
            "food" => Some(PickupKind::Food),
            "special" => Some(PickupKind::Special),
            "ammo" => Some(PickupKind::Ammo),
            "armor" => Some(PickupKind::Armor),
            _ => None,
        }
    }
}

/// A collectible sitting on one grid cell. It is also its own wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: String,
    pub position: Vector,
    #[serde(rename = "type")]
    pub kind: PickupKind,
}

impl Pickup {
    pub fn new(id: impl Into<String>, position: Vector, kind: PickupKind) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
        }
    }

    pub fn is_at(&self, pos: Vector) -> bool {
        self.position == pos
    }

    pub fn apply_to(&self, snake: &mut Snake, ruleset: Ruleset) {
        let effect = self.kind.effect(ruleset);
        if effect.grow > 0 {
            snake.grow(effect.grow);
        }
        if effect.ammo > 0 {
            snake.add_ammo(effect.ammo);
        }
        if effect.armor > 0 {
            snake.add_armor(effect.armor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::SnakeOptions;

    fn snake() -> Snake {
        Snake::new(SnakeOptions::new("p1", Vector::new(5, 5), Vector::RIGHT))
    }

    #[test]
    fn test_is_at() {
        let pickup = Pickup::new("food-1", Vector::new(3, 4), PickupKind::Food);
        assert!(pickup.is_at(Vector::new(3, 4)));
        assert!(!pickup.is_at(Vector::new(4, 3)));
    }

    #[test]
    fn test_effect_table() {
        let mut s = snake();
        let combat = Ruleset::Combat;

        Pickup::new("f", Vector::ZERO, PickupKind::Food).apply_to(&mut s, combat);
        assert_eq!(s.pending_grow, 1);

        Pickup::new("s", Vector::ZERO, PickupKind::Special).apply_to(&mut s, combat);
        assert_eq!(s.pending_grow, 4);

        Pickup::new("a", Vector::ZERO, PickupKind::Ammo).apply_to(&mut s, combat);
        assert_eq!(s.ammo, 3);
        assert_eq!(s.pending_grow, 4);

        Pickup::new("r", Vector::ZERO, PickupKind::Armor).apply_to(&mut s, combat);
        assert_eq!(s.armor, 1);
    }

    #[test]
    fn test_classic_pickups_grow_by_one() {
        let mut s = snake();
        let classic = Ruleset::Classic;

        Pickup::new("s", Vector::ZERO, PickupKind::Special).apply_to(&mut s, classic);
        assert_eq!(s.pending_grow, 1);

        Pickup::new("a", Vector::ZERO, PickupKind::Ammo).apply_to(&mut s, classic);
        assert_eq!(s.pending_grow, 2);
        assert_eq!(s.ammo, 0);
        assert_eq!(s.armor, 0);

        for kind in [PickupKind::Food, PickupKind::Special, PickupKind::Armor] {
            assert_eq!(kind.effect(classic).grow, 1);
        }
    }

    #[test]
    fn test_kind_names() {
        for kind in [
            PickupKind::Food,
            PickupKind::Special,
            PickupKind::Ammo,
            PickupKind::Armor,
        ] {
            assert_eq!(PickupKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(PickupKind::from_name("bomb"), None);
    }

    #[test]
    fn test_wire_shape() {
        let pickup = Pickup::new("food-7", Vector::new(2, 9), PickupKind::Special);
        let json = serde_json::to_value(&pickup).unwrap();

        assert_eq!(json["id"], "food-7");
        assert_eq!(json["type"], "special");
        assert_eq!(json["position"]["x"], 2);

        let back: Pickup = serde_json::from_value(json).unwrap();
        assert_eq!(back, pickup);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"id":"x","position":{"x":1,"y":1},"type":"bomb"}"#;
        assert!(serde_json::from_str::<Pickup>(json).is_err());
    }
}
