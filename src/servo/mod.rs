// Servo control for the DeskBit car
//
// Provides:
// - The pin capability trait and a recording simulated pin
// - The clamping servo driver
// - A serial bridge backend for real hardware

pub mod bridge;
mod driver;
pub mod pin;

pub use bridge::{BridgeError, BridgePin, SerialBridge};
pub use driver::{ConfigError, Servo, ServoConfig};
pub use pin::{Mirrored, PinWrite, ServoPin, SimPin};
