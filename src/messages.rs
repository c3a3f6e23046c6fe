// Message types carried over the bus

use serde::{Deserialize, Serialize};

use crate::motion::{Direction, Side, WheelDirection};

// Command from remote scripts/blocks -> runtime
// Tagged by "cmd", e.g. {"cmd":"run","direction":"forward","speed":50}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CarCommand {
    Run {
        direction: Direction,
        speed: i32,
    },
    RunWheel {
        side: Side,
        direction: WheelDirection,
        speed: i32,
    },
    Stop,
    SetArmAngle {
        angle: i32,
    },
    /// Decode the receiver once and publish the result (may be -1)
    ReadKey,
}

// Raw infrared code as the receiver produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawIrCode {
    pub code: u32,
}

// Decoded key, published once per callback invocation or on request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: i32,
}

/// Last angle written to each servo (None = never written or de-energized)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServoState {
    pub left: Option<i32>,
    pub right: Option<i32>,
    pub arm: Option<i32>,
    pub listening: bool,
}
