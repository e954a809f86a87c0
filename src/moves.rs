use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

/// One discrete joystick input: a direction or a face button.
///
/// The serialized spelling matches the code-store wire format
/// ("UP", "DOWN", ..., "A", "B").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    X,
    Y,
}

impl Move {
    pub const ALL: [Move; 8] = [
        Move::Up,
        Move::Down,
        Move::Left,
        Move::Right,
        Move::A,
        Move::B,
        Move::X,
        Move::Y,
    ];

    pub const BUTTONS: [Move; 4] = [Move::A, Move::B, Move::X, Move::Y];

    /// Keyboard fallback bindings: arrow keys plus a/b/x/y.
    pub fn from_key(code: KeyCode) -> Option<Move> {
        match code {
            KeyCode::Up => Some(Move::Up),
            KeyCode::Down => Some(Move::Down),
            KeyCode::Left => Some(Move::Left),
            KeyCode::Right => Some(Move::Right),
            KeyCode::Char('a') | KeyCode::Char('A') => Some(Move::A),
            KeyCode::Char('b') | KeyCode::Char('B') => Some(Move::B),
            KeyCode::Char('x') | KeyCode::Char('X') => Some(Move::X),
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(Move::Y),
            _ => None,
        }
    }

    /// Glyph used when rendering the move in a sequence row.
    pub fn glyph(&self) -> &'static str {
        match self {
            Move::Up => "▲",
            Move::Down => "▼",
            Move::Left => "◀",
            Move::Right => "▶",
            Move::A => "Ⓐ",
            Move::B => "Ⓑ",
            Move::X => "Ⓧ",
            Move::Y => "Ⓨ",
        }
    }

    pub fn is_button(&self) -> bool {
        matches!(self, Move::A | Move::B | Move::X | Move::Y)
    }
}

/// The fixed demo sequence used whenever no eligible code record exists.
pub const FALLBACK_SEQUENCE: [Move; 8] = [
    Move::Up,
    Move::Up,
    Move::Down,
    Move::Down,
    Move::Left,
    Move::Right,
    Move::Left,
    Move::Right,
];
