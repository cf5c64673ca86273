//! Identifier generation: room codes and anonymous display names.

use rand::{Rng, seq::SliceRandom};

use super::value_object::{DisplayName, ROOM_CODE_LENGTH, RoomId};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const ADJECTIVES: &[&str] = &[
    "Swift",
    "Silent",
    "Brave",
    "Clever",
    "Mystic",
    "Golden",
    "Crimson",
    "Azure",
    "Emerald",
    "Whispering",
];

const NOUNS: &[&str] = &[
    "Wolf", "Eagle", "Lion", "Fox", "Bear", "Dragon", "Phoenix", "Shadow", "River", "Mountain",
];

/// Source of room codes and display names.
///
/// Codes are short, so two calls may collide; callers that need uniqueness
/// must check against the durable store.
pub trait IdentifierGenerator: Send + Sync {
    fn room_code(&self) -> RoomId;

    fn display_name(&self) -> DisplayName;
}

/// `rand`-backed generator used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentifierGenerator;

impl IdentifierGenerator for RandomIdentifierGenerator {
    fn room_code(&self) -> RoomId {
        let mut rng = rand::thread_rng();
        let code: String = (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        // The alphabet and length always satisfy RoomId's rules.
        RoomId::new(code).unwrap_or_else(|e| unreachable!("generated room code rejected: {e}"))
    }

    fn display_name(&self) -> DisplayName {
        let mut rng = rand::thread_rng();
        let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Swift");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Wolf");
        DisplayName::new(format!("Guest_{}_{}", adjective, noun))
    }
}
