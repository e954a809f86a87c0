use crate::moves::Move;

/// Snapshot of the pad read at one polling instant.
///
/// Axes follow the common HID convention: y is negative toward up, x is
/// negative toward left, both in -1.0..=1.0. Buttons are index-mapped to
/// A, B, X, Y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PadState {
    pub x_axis: f64,
    pub y_axis: f64,
    pub buttons: [bool; 4],
}

/// Something that can be polled for the current pad state. Returns `None`
/// when no device is attached; keyboard input remains available either way.
pub trait PadSource {
    fn poll(&mut self) -> Option<PadState>;
}

/// A source for kiosks without a pad; the keyboard bindings carry the screen.
#[derive(Debug, Default)]
pub struct NoPad;

impl PadSource for NoPad {
    fn poll(&mut self) -> Option<PadState> {
        None
    }
}

/// Scripted source for driving the screen in tests.
#[derive(Debug, Default)]
pub struct ScriptedPad {
    frames: Vec<Option<PadState>>,
    cursor: usize,
}

impl ScriptedPad {
    pub fn new(frames: Vec<Option<PadState>>) -> Self {
        Self { frames, cursor: 0 }
    }
}

impl PadSource for ScriptedPad {
    fn poll(&mut self) -> Option<PadState> {
        let frame = self.frames.get(self.cursor).copied().flatten();
        if self.cursor < self.frames.len() {
            self.cursor += 1;
        }
        frame
    }
}

/// Decode one pad snapshot into at most one move.
///
/// Axis directions win over buttons and are checked in the fixed order
/// UP, DOWN, LEFT, RIGHT; an axis only registers past the dead zone.
pub fn decode(state: PadState, dead_zone: f64) -> Option<Move> {
    if state.y_axis < -dead_zone {
        return Some(Move::Up);
    }
    if state.y_axis > dead_zone {
        return Some(Move::Down);
    }
    if state.x_axis < -dead_zone {
        return Some(Move::Left);
    }
    if state.x_axis > dead_zone {
        return Some(Move::Right);
    }
    for (i, &pressed) in state.buttons.iter().enumerate() {
        if pressed {
            return Some(Move::BUTTONS[i]);
        }
    }
    None
}
