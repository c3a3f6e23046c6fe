// Output pin capability consumed by the servo driver
//
// The pin owns the angle-to-pulse conversion; the driver only decides
// which angle (or pulse, or de-energize) to send.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Something a servo can be wired to
pub trait ServoPin {
    /// Command an angle in degrees
    fn servo_write(&mut self, degrees: i32);

    /// Command a raw pulse width in microseconds
    fn servo_set_pulse(&mut self, micros: u32);

    /// Drive the pin as plain digital output (false de-energizes the servo)
    fn digital_write(&mut self, high: bool);
}

impl<P: ServoPin + ?Sized> ServoPin for Box<P> {
    fn servo_write(&mut self, degrees: i32) {
        (**self).servo_write(degrees)
    }

    fn servo_set_pulse(&mut self, micros: u32) {
        (**self).servo_set_pulse(micros)
    }

    fn digital_write(&mut self, high: bool) {
        (**self).digital_write(high)
    }
}

/// One recorded write to a simulated pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Angle(i32),
    Pulse(u32),
    Digital(bool),
}

/// Writes kept by a simulated pin before the oldest are dropped
const HISTORY_LIMIT: usize = 256;

/// Simulated pin that records its recent writes
///
/// Clones share the same log, so a test (or the runtime) can keep a handle
/// while the servo owns the pin.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    writes: Arc<Mutex<VecDeque<PinWrite>>>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded writes, oldest first
    pub fn writes(&self) -> Vec<PinWrite> {
        self.log().iter().copied().collect()
    }

    /// Most recent write, if any
    pub fn last(&self) -> Option<PinWrite> {
        self.log().back().copied()
    }

    /// Angle currently commanded, or None when de-energized / never written
    pub fn angle(&self) -> Option<i32> {
        match self.last()? {
            PinWrite::Angle(degrees) => Some(degrees),
            _ => None,
        }
    }

    fn record(&self, write: PinWrite) {
        let mut log = self.log();
        if log.len() == HISTORY_LIMIT {
            log.pop_front();
        }
        log.push_back(write);
    }

    fn log(&self) -> std::sync::MutexGuard<'_, VecDeque<PinWrite>> {
        // A poisoned log still holds valid writes
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ServoPin for SimPin {
    fn servo_write(&mut self, degrees: i32) {
        self.record(PinWrite::Angle(degrees));
    }

    fn servo_set_pulse(&mut self, micros: u32) {
        self.record(PinWrite::Pulse(micros));
    }

    fn digital_write(&mut self, high: bool) {
        self.record(PinWrite::Digital(high));
    }
}

/// Forwards every write to a pin and mirrors it into a `SimPin`
///
/// Lets the runtime report what it last sent to hardware it cannot read back.
pub struct Mirrored<P: ServoPin> {
    inner: P,
    mirror: SimPin,
}

impl<P: ServoPin> Mirrored<P> {
    pub fn new(inner: P, mirror: SimPin) -> Self {
        Self { inner, mirror }
    }
}

impl<P: ServoPin> ServoPin for Mirrored<P> {
    fn servo_write(&mut self, degrees: i32) {
        self.inner.servo_write(degrees);
        self.mirror.servo_write(degrees);
    }

    fn servo_set_pulse(&mut self, micros: u32) {
        self.inner.servo_set_pulse(micros);
        self.mirror.servo_set_pulse(micros);
    }

    fn digital_write(&mut self, high: bool) {
        self.inner.digital_write(high);
        self.mirror.digital_write(high);
    }
}
