// The DeskBit car: two wheel servos, the arm servo and the IR listener
//
// Owned by whoever runs the poll loop and passed by reference to anything
// that drives the car. All methods run on that one task.

use tracing::info;

use crate::ir::IrSource;
use crate::listener::KeyListener;
use crate::motion::{self, Direction, Side, WheelAngles, WheelDirection};
use crate::servo::{Servo, ServoPin};

pub struct DeskBit<P: ServoPin, S: IrSource> {
    left_wheel: Servo<P>,
    right_wheel: Servo<P>,
    arm: Servo<P>,
    listener: KeyListener<S>,
}

impl<P: ServoPin, S: IrSource> DeskBit<P, S> {
    /// Wire up the three servos and the IR receiver
    pub fn new(left_pin: P, right_pin: P, arm_pin: P, ir_source: S) -> Self {
        Self {
            left_wheel: Servo::new("left wheel", left_pin),
            right_wheel: Servo::new("right wheel", right_pin),
            arm: Servo::new("arm", arm_pin),
            listener: KeyListener::new(ir_source),
        }
    }

    /// Drive the car in a direction at a speed percentage (0..=100)
    pub fn run(&mut self, direction: Direction, speed: i32) {
        let angles = motion::drive_angles(direction, speed);
        self.write_wheels(angles);
    }

    /// Drive one wheel, leaving the other on its last command
    pub fn run_wheel(&mut self, side: Side, direction: WheelDirection, speed: i32) {
        let angle = motion::wheel_angle(side, direction, speed);
        match side {
            Side::Left => self.left_wheel.set_angle_unclamped(angle),
            Side::Right => self.right_wheel.set_angle_unclamped(angle),
        }
    }

    /// Hold both wheels at neutral
    pub fn stop(&mut self) {
        info!("Stopping car");
        self.write_wheels(WheelAngles::neutral());
    }

    /// Move the arm; the angle is written without clamping
    pub fn set_arm_angle(&mut self, angle: i32) {
        self.arm.set_angle_unclamped(angle);
    }

    fn write_wheels(&mut self, angles: WheelAngles) {
        self.left_wheel.set_angle_unclamped(angles.left);
        self.right_wheel.set_angle_unclamped(angles.right);
    }

    /// Decode the receiver's current code on demand (-1 when nothing known)
    pub fn read_decoded_key(&mut self) -> i32 {
        self.listener.read_decoded_key()
    }

    /// Register a key callback; the first one starts the poll loop
    pub fn on_key_received(&mut self, callback: impl FnMut(i32) + Send + 'static) {
        self.listener.on_key_received(callback);
    }

    /// Body of the periodic poll task
    pub fn poll_tick(&mut self) -> Option<i32> {
        self.listener.tick()
    }

    pub fn listener(&self) -> &KeyListener<S> {
        &self.listener
    }

    pub fn left_wheel(&mut self) -> &mut Servo<P> {
        &mut self.left_wheel
    }

    pub fn right_wheel(&mut self) -> &mut Servo<P> {
        &mut self.right_wheel
    }

    pub fn arm(&mut self) -> &mut Servo<P> {
        &mut self.arm
    }
}
