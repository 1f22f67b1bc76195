//! Client input management with sequencing
//!
//! The follower reads one command per line from the terminal. Direction
//! words map to arrow keys, `fire` maps to the fire key, and anything else
//! is forwarded as a raw key name for the host's key maps to judge.

use shared::{InputState, FIRE_KEY};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Something the user asked for at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Key(InputState),
    Start,
    Quit,
}

/// Turns typed lines into sequenced key presses
pub struct InputManager {
    next_sequence: u32,
}

impl InputManager {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    /// Parses one line of user input. Blank lines yield nothing.
    pub fn parse_line(&mut self, line: &str) -> Option<Command> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }

        match word.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "quit" | "exit" => Some(Command::Quit),
            _ => Some(Command::Key(self.next_input(Self::key_name(word)))),
        }
    }

    /// Stamps a key press with the next sequence number.
    pub fn next_input(&mut self, key: &str) -> InputState {
        let input = InputState {
            sequence: self.next_sequence,
            timestamp: Self::get_timestamp(),
            key: key.to_string(),
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);
        input
    }

    fn key_name(word: &str) -> &str {
        match word.to_ascii_lowercase().as_str() {
            "up" => "ArrowUp",
            "down" => "ArrowDown",
            "left" => "ArrowLeft",
            "right" => "ArrowRight",
            "fire" => FIRE_KEY,
            _ => word,
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(command: Option<Command>) -> String {
        match command {
            Some(Command::Key(input)) => input.key,
            other => panic!("expected a key, got {:?}", other),
        }
    }

    #[test]
    fn test_input_manager_creation() {
        let input_manager = InputManager::new();
        assert_eq!(input_manager.next_sequence, 1);
    }

    #[test]
    fn test_get_timestamp() {
        let timestamp1 = InputManager::get_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let timestamp2 = InputManager::get_timestamp();
        assert!(timestamp2 > timestamp1);
    }

    #[test]
    fn test_direction_words_map_to_arrows() {
        let mut manager = InputManager::new();
        assert_eq!(key_of(manager.parse_line("up")), "ArrowUp");
        assert_eq!(key_of(manager.parse_line("LEFT\n")), "ArrowLeft");
        assert_eq!(key_of(manager.parse_line("fire")), FIRE_KEY);
        assert_eq!(key_of(manager.parse_line("w")), "w");
    }

    #[test]
    fn test_commands() {
        let mut manager = InputManager::new();
        assert_eq!(manager.parse_line("start"), Some(Command::Start));
        assert_eq!(manager.parse_line(" quit "), Some(Command::Quit));
        assert_eq!(manager.parse_line("   "), None);
        assert_eq!(manager.next_sequence, 1);
    }

    #[test]
    fn test_sequences_increase() {
        let mut manager = InputManager::new();
        let first = manager.next_input("a");
        let second = manager.next_input("d");
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(second.timestamp >= first.timestamp);
    }
}
