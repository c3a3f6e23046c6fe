// Drive mapping for the two continuous-rotation wheel servos
//
// A continuous-rotation servo treats the commanded angle as speed and
// direction: 90 holds still, 180 is full speed one way, 0 full speed the
// other. The wheels are mounted mirrored, so driving straight needs one
// wheel clockwise and the other counter-clockwise.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::{NEUTRAL_ANGLE, SERVO_MAX_ANGLE, SERVO_MIN_ANGLE, SPEED_MAX, SPEED_MIN};

/// Whole-car direction, with the numeric codes the remote blocks use
///
/// Code 2 spins both wheels clockwise and code 3 counter-clockwise. Which of
/// those turns the car left on the real chassis has not been confirmed, so
/// the code-to-wheel mapping is kept exactly as shipped.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward = 0,
    Backward = 1,
    RotateRight = 2,
    RotateLeft = 3,
}

impl Direction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Forward),
            1 => Some(Direction::Backward),
            2 => Some(Direction::RotateRight),
            3 => Some(Direction::RotateLeft),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Which wheel a single-wheel command targets
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left = 0,
    Right = 1,
}

/// Direction of a single wheel, relative to the car
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelDirection {
    Forward = 0,
    Backward = 1,
}

/// Target angles for both wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelAngles {
    pub left: i32,
    pub right: i32,
}

impl WheelAngles {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Both wheels holding still
    pub fn neutral() -> Self {
        Self::new(NEUTRAL_ANGLE, NEUTRAL_ANGLE)
    }
}

/// Linear map of `value` from `from` onto `to`, rounded to the nearest
/// integer with ties going to the even result
///
/// Around an even midpoint such as 90 this keeps `cw(s) + ccw(s) == 180` at
/// odd speeds.
pub fn map_range(value: i32, from: (i32, i32), to: (i32, i32)) -> i32 {
    let (from_low, from_high) = (from.0 as i128, from.1 as i128);
    let (to_low, to_high) = (to.0 as i128, to.1 as i128);
    if from_low == from_high {
        return to.0;
    }

    let num = (value as i128 - from_low) * (to_high - to_low);
    let den = from_high - from_low;
    let quotient = num / den;
    let rest = num % den;
    let step = num.signum() * den.signum();
    let offset = match (2 * rest.abs()).cmp(&den.abs()) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + step,
        Ordering::Equal if (to_low + quotient) % 2 == 0 => quotient,
        Ordering::Equal => quotient + step,
    };

    (to_low + offset).clamp(i32::MIN as i128, i32::MAX as i128) as i32
}

fn clamp_speed(speed: i32) -> i32 {
    speed.clamp(SPEED_MIN, SPEED_MAX)
}

/// Clockwise-biased wheel angle for a speed percentage (90..=180)
pub fn cw(speed: i32) -> i32 {
    map_range(
        clamp_speed(speed),
        (SPEED_MIN, SPEED_MAX),
        (NEUTRAL_ANGLE, SERVO_MAX_ANGLE),
    )
}

/// Counter-clockwise-biased wheel angle for a speed percentage (0..=90)
pub fn ccw(speed: i32) -> i32 {
    map_range(
        clamp_speed(speed),
        (SPEED_MIN, SPEED_MAX),
        (NEUTRAL_ANGLE, SERVO_MIN_ANGLE),
    )
}

/// Wheel angles for driving the whole car
pub fn drive_angles(direction: Direction, speed: i32) -> WheelAngles {
    let (cw, ccw) = (cw(speed), ccw(speed));
    match direction {
        Direction::Forward => WheelAngles::new(cw, ccw),
        Direction::Backward => WheelAngles::new(ccw, cw),
        Direction::RotateRight => WheelAngles::new(cw, cw),
        Direction::RotateLeft => WheelAngles::new(ccw, ccw),
    }
}

/// Angle for one wheel driven on its own
pub fn wheel_angle(side: Side, direction: WheelDirection, speed: i32) -> i32 {
    match (side, direction) {
        (Side::Left, WheelDirection::Forward) => cw(speed),
        (Side::Left, WheelDirection::Backward) => ccw(speed),
        (Side::Right, WheelDirection::Forward) => ccw(speed),
        (Side::Right, WheelDirection::Backward) => cw(speed),
    }
}
