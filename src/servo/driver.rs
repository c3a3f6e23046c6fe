// Servo driver: one servo bound to one output pin
//
// Angles go through the configured clamp unless the caller explicitly
// bypasses it (the motion code already guarantees a valid range).

use tracing::debug;

use super::pin::ServoPin;
use crate::config::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};

/// Error types for servo configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid servo range {min}..={max} (expected 0..=180 with min <= max)")]
    InvalidRange { min: i32, max: i32 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Angular range a servo accepts through `set_angle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoConfig {
    min_angle: i32,
    max_angle: i32,
}

impl ServoConfig {
    /// Build a range, rejecting anything outside 0..=180 or with min > max
    pub fn new(min_angle: i32, max_angle: i32) -> Result<Self> {
        let valid = SERVO_MIN_ANGLE <= min_angle
            && min_angle <= max_angle
            && max_angle <= SERVO_MAX_ANGLE;
        if !valid {
            return Err(ConfigError::InvalidRange {
                min: min_angle,
                max: max_angle,
            });
        }
        Ok(Self {
            min_angle,
            max_angle,
        })
    }

    pub fn min_angle(&self) -> i32 {
        self.min_angle
    }

    pub fn max_angle(&self) -> i32 {
        self.max_angle
    }

    /// Bound an integer angle into this range
    pub fn clamp(&self, degrees: i32) -> i32 {
        degrees.clamp(self.min_angle, self.max_angle)
    }

    /// Truncate toward zero, then bound into this range
    pub fn clamp_f32(&self, degrees: f32) -> i32 {
        // `as` saturates and maps NaN to 0
        self.clamp(degrees.trunc() as i32)
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            min_angle: SERVO_MIN_ANGLE,
            max_angle: SERVO_MAX_ANGLE,
        }
    }
}

/// A servo driven through a pin capability
pub struct Servo<P: ServoPin> {
    pin: P,
    config: ServoConfig,
    name: &'static str,
}

impl<P: ServoPin> Servo<P> {
    /// Create a servo with the full 0..=180 range
    pub fn new(name: &'static str, pin: P) -> Self {
        Self::with_config(name, pin, ServoConfig::default())
    }

    /// Create with a custom range
    pub fn with_config(name: &'static str, pin: P, config: ServoConfig) -> Self {
        Self { pin, config, name }
    }

    /// Clamp into the configured range and write the angle
    pub fn set_angle(&mut self, degrees: i32) {
        let clamped = self.config.clamp(degrees);
        self.set_angle_unclamped(clamped);
    }

    /// Fractional variant of `set_angle`; the fraction is truncated, not rounded
    pub fn set_angle_f32(&mut self, degrees: f32) {
        let clamped = self.config.clamp_f32(degrees);
        self.set_angle_unclamped(clamped);
    }

    /// Write the angle as-is
    ///
    /// Used by the drive code, which only ever produces 0..=180.
    pub fn set_angle_unclamped(&mut self, degrees: i32) {
        debug!("{} servo -> {}°", self.name, degrees);
        self.pin.servo_write(degrees);
    }

    /// Command a raw pulse width in microseconds
    pub fn set_pulse(&mut self, micros: u32) {
        debug!("{} servo -> {}µs pulse", self.name, micros);
        self.pin.servo_set_pulse(micros);
    }

    /// De-energize the output
    ///
    /// A positional servo stays where it is without holding torque; it is
    /// not recentered.
    pub fn stop(&mut self) {
        debug!("{} servo de-energized", self.name);
        self.pin.digital_write(false);
    }

    /// Replace the clamp range
    pub fn set_range(&mut self, min_angle: i32, max_angle: i32) -> Result<()> {
        self.config = ServoConfig::new(min_angle, max_angle)?;
        Ok(())
    }

    pub fn min_angle(&self) -> i32 {
        self.config.min_angle()
    }

    pub fn max_angle(&self) -> i32 {
        self.config.max_angle()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servo::pin::{PinWrite, SimPin};

    #[test]
    fn test_clamp_stays_in_range() {
        let config = ServoConfig::new(30, 150).unwrap();
        for angle in [-1000, -1, 0, 29, 30, 90, 150, 151, 1000, i32::MIN, i32::MAX] {
            let clamped = config.clamp(angle);
            assert!(
                (30..=150).contains(&clamped),
                "clamp({}) = {} escaped 30..=150",
                angle,
                clamped
            );
        }
    }

    #[test]
    fn test_clamp_identity_in_range() {
        let config = ServoConfig::default();
        for angle in 0..=180 {
            assert_eq!(config.clamp(angle), angle);
        }
    }

    #[test]
    fn test_clamp_truncates_before_bounding() {
        let config = ServoConfig::new(10, 170).unwrap();
        assert_eq!(config.clamp_f32(45.9), 45);
        assert_eq!(config.clamp_f32(-0.7), 10);
        assert_eq!(config.clamp_f32(170.99), 170);
        assert_eq!(config.clamp_f32(9.99), 10);
        assert_eq!(config.clamp_f32(f32::NAN), 10);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert_eq!(
            ServoConfig::new(100, 50),
            Err(ConfigError::InvalidRange { min: 100, max: 50 })
        );
        assert!(ServoConfig::new(-1, 90).is_err());
        assert!(ServoConfig::new(0, 181).is_err());
        assert!(ServoConfig::new(90, 90).is_ok());
    }

    #[test]
    fn test_set_angle_clamps_but_unclamped_does_not() {
        let pin = SimPin::new();
        let mut servo = Servo::with_config("arm", pin.clone(), ServoConfig::new(20, 160).unwrap());

        servo.set_angle(200);
        servo.set_angle(5);
        servo.set_angle_unclamped(180);

        assert_eq!(
            pin.writes(),
            vec![PinWrite::Angle(160), PinWrite::Angle(20), PinWrite::Angle(180)]
        );
    }

    #[test]
    fn test_fractional_angle_truncates_then_clamps() {
        let pin = SimPin::new();
        let mut servo = Servo::with_config("arm", pin.clone(), ServoConfig::new(20, 160).unwrap());

        servo.set_angle_f32(45.9);
        servo.set_angle_f32(19.99);
        servo.set_angle_f32(500.0);
        servo.set_angle_f32(f32::NAN);

        assert_eq!(
            pin.writes(),
            vec![
                PinWrite::Angle(45),
                PinWrite::Angle(20),
                PinWrite::Angle(160),
                PinWrite::Angle(20)
            ]
        );
    }

    #[test]
    fn test_stop_and_pulse_writes() {
        let pin = SimPin::new();
        let mut servo = Servo::new("left wheel", pin.clone());

        servo.set_pulse(1500);
        servo.stop();

        assert_eq!(
            pin.writes(),
            vec![PinWrite::Pulse(1500), PinWrite::Digital(false)]
        );
    }

    #[test]
    fn test_failed_reconfigure_keeps_previous_range() {
        let mut servo = Servo::new("arm", SimPin::new());
        assert_eq!((servo.min_angle(), servo.max_angle()), (0, 180));

        servo.set_range(45, 135).unwrap();
        assert_eq!((servo.min_angle(), servo.max_angle()), (45, 135));

        assert!(servo.set_range(150, 10).is_err());
        assert_eq!((servo.min_angle(), servo.max_angle()), (45, 135));
    }
}
