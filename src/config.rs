// Pin assignments, servo ranges, loop timing, topics, bridge defaults
use std::time::Duration;

// Fixed pin bindings (one servo per pin)
pub const LEFT_WHEEL_PIN: u8 = 2;
pub const RIGHT_WHEEL_PIN: u8 = 1;
pub const ARM_PIN: u8 = 0;

// Angular range shared by all three servos
pub const SERVO_MIN_ANGLE: i32 = 0;
pub const SERVO_MAX_ANGLE: i32 = 180;

// Continuous-rotation servos hold still at this angle
pub const NEUTRAL_ANGLE: i32 = 90;

// Speed percentage accepted by the drive operations
pub const SPEED_MIN: i32 = 0;
pub const SPEED_MAX: i32 = 100;

// IR poll period (50 Hz)
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

// Zenoh topics
pub const TOPIC_CMD_CAR: &str = "deskbit/cmd/car"; // drive commands
pub const TOPIC_IR_RAW: &str = "deskbit/ir/raw"; // raw codes from a remote
pub const TOPIC_IR_KEY: &str = "deskbit/ir/key"; // decoded key events
pub const TOPIC_SERVO_STATE: &str = "deskbit/state/servos"; // last written angles

// Serial bridge to the microcontroller that owns the pins
pub const BRIDGE_PORT: &str = "/dev/ttyACM0";
pub const BRIDGE_BAUDRATE: u32 = 115_200;
pub const BRIDGE_TIMEOUT: Duration = Duration::from_millis(10);
