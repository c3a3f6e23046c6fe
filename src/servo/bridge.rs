// Serial bridge to a microcontroller that owns the servo and IR pins
//
// Packet format: [0xFF, 0xFF, Pin, Length, Instruction, Params..., Checksum]
// Length counts instruction + params + checksum. Writes get no reply; a
// ReadIrCode request is answered with [0xFF, 0xFF, Pin, Length, Status,
// Code (u32 LE), Checksum].

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::pin::ServoPin;
use crate::config::{BRIDGE_BAUDRATE, BRIDGE_TIMEOUT};
use crate::ir::{IrSource, NO_SIGNAL};

/// Packet header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Pin id used for requests that are not tied to a servo pin
pub const IR_RECEIVER_ID: u8 = 0xFE;

/// Instruction set understood by the bridge firmware
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ServoWrite = 0x01,
    SetPulse = 0x02,
    DigitalWrite = 0x03,
    ReadIrCode = 0x10,
}

/// Error types for bridge communication
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response for pin {pin}: {reason}")]
    InvalidResponse { pin: u8, reason: String },

    #[error("Checksum mismatch for pin {pin}")]
    ChecksumMismatch { pin: u8 },

    #[error("Bridge reported error status 0x{status:02X} for pin {pin}")]
    Status { pin: u8, status: u8 },

    #[error("Timeout waiting for response for pin {pin}")]
    Timeout { pin: u8 },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Serial connection to the bridge
pub struct SerialBridge {
    port: Box<dyn SerialPort>,
}

impl SerialBridge {
    /// Open the bridge at the default baudrate
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, BRIDGE_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(BRIDGE_TIMEOUT)
            .open()?;

        Ok(Self { port })
    }

    /// Wrap the bridge so several pins can share it
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    /// Calculate checksum for a packet (excluding header)
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    /// Build a packet with header and checksum
    fn build_packet(pin: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8;
        let mut packet = Vec::with_capacity(6 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(pin);
        packet.push(length);
        packet.push(instruction as u8);
        packet.extend_from_slice(params);

        let checksum = Self::checksum(&packet[2..]);
        packet.push(checksum);

        packet
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Send an instruction that has no reply
    pub fn write(&mut self, pin: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = Self::build_packet(pin, instruction, params);
        debug!("Bridge write pin {}: {:?} {:02X?}", pin, instruction, params);
        self.send_packet(&packet)
    }

    /// Read a reply packet and return its parameters
    fn read_response(&mut self, expected_pin: u8) -> Result<Vec<u8>> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BridgeError::Timeout { pin: expected_pin }
            } else {
                BridgeError::Io(e)
            }
        })?;

        if header != HEADER {
            return Err(BridgeError::InvalidResponse {
                pin: expected_pin,
                reason: format!("Invalid header: {:02X?}", header),
            });
        }

        let mut pin_length = [0u8; 2];
        self.port.read_exact(&mut pin_length)?;
        let [pin, length] = pin_length;

        let mut remaining = vec![0u8; length as usize];
        self.port.read_exact(&mut remaining)?;

        Self::check_response(expected_pin, pin, &remaining)
    }

    /// Validate pin, length, checksum and status of a reply body
    ///
    /// `body` is everything after the length byte: status, params, checksum.
    fn check_response(expected_pin: u8, pin: u8, body: &[u8]) -> Result<Vec<u8>> {
        if pin != expected_pin {
            return Err(BridgeError::InvalidResponse {
                pin: expected_pin,
                reason: format!("Pin mismatch: expected {}, got {}", expected_pin, pin),
            });
        }

        if body.len() < 2 {
            return Err(BridgeError::InvalidResponse {
                pin,
                reason: format!("Reply too short: {} bytes", body.len()),
            });
        }

        let (content, received) = body.split_at(body.len() - 1);
        let mut checksum_data = vec![pin, body.len() as u8];
        checksum_data.extend_from_slice(content);
        if Self::checksum(&checksum_data) != received[0] {
            return Err(BridgeError::ChecksumMismatch { pin });
        }

        let status = content[0];
        if status != 0 {
            return Err(BridgeError::Status { pin, status });
        }

        Ok(content[1..].to_vec())
    }

    /// Ask the bridge for the most recent raw IR code
    pub fn read_ir_code(&mut self) -> Result<u32> {
        let packet = Self::build_packet(IR_RECEIVER_ID, Instruction::ReadIrCode, &[]);
        self.send_packet(&packet)?;

        let params = self.read_response(IR_RECEIVER_ID)?;
        let bytes: [u8; 4] =
            params
                .as_slice()
                .try_into()
                .map_err(|_| BridgeError::InvalidResponse {
                    pin: IR_RECEIVER_ID,
                    reason: format!("Expected 4 code bytes, got {}", params.len()),
                })?;
        Ok(u32::from_le_bytes(bytes))
    }

    // === Pin commands ===

    pub fn servo_write(&mut self, pin: u8, degrees: i32) -> Result<()> {
        // The wire carries one byte; the drive code never leaves 0..=180
        let angle = degrees.clamp(0, u8::MAX as i32) as u8;
        self.write(pin, Instruction::ServoWrite, &[angle])
    }

    pub fn set_pulse(&mut self, pin: u8, micros: u32) -> Result<()> {
        let micros = micros.min(u16::MAX as u32) as u16;
        self.write(pin, Instruction::SetPulse, &micros.to_le_bytes())
    }

    pub fn digital_write(&mut self, pin: u8, high: bool) -> Result<()> {
        self.write(pin, Instruction::DigitalWrite, &[high as u8])
    }
}

/// The raw IR capability: transport failures read as "no signal"
impl IrSource for SerialBridge {
    fn read_raw_code(&mut self) -> u32 {
        match self.read_ir_code() {
            Ok(code) => code,
            Err(e @ BridgeError::Timeout { .. }) => {
                debug!("{}", e);
                NO_SIGNAL
            }
            Err(e) => {
                warn!("IR read failed: {}", e);
                NO_SIGNAL
            }
        }
    }
}

/// Shared bridge handle used as the IR source
impl IrSource for Arc<Mutex<SerialBridge>> {
    fn read_raw_code(&mut self) -> u32 {
        match self.lock() {
            Ok(mut bridge) => bridge.read_raw_code(),
            Err(_) => {
                warn!("Bridge lock poisoned, treating as no signal");
                NO_SIGNAL
            }
        }
    }
}

/// One servo pin on a shared bridge
pub struct BridgePin {
    bridge: Arc<Mutex<SerialBridge>>,
    pin: u8,
}

impl BridgePin {
    pub fn new(bridge: Arc<Mutex<SerialBridge>>, pin: u8) -> Self {
        Self { bridge, pin }
    }

    fn with_bridge(&self, op: impl FnOnce(&mut SerialBridge) -> Result<()>) {
        let result = match self.bridge.lock() {
            Ok(mut bridge) => op(&mut *bridge),
            Err(_) => {
                warn!("Bridge lock poisoned, dropping write to pin {}", self.pin);
                return;
            }
        };
        // Pin writes are fire-and-forget; a failed write is only reported
        if let Err(e) = result {
            warn!("Write to pin {} failed: {}", self.pin, e);
        }
    }
}

impl ServoPin for BridgePin {
    fn servo_write(&mut self, degrees: i32) {
        let pin = self.pin;
        self.with_bridge(|bridge| bridge.servo_write(pin, degrees));
    }

    fn servo_set_pulse(&mut self, micros: u32) {
        let pin = self.pin;
        self.with_bridge(|bridge| bridge.set_pulse(pin, micros));
    }

    fn digital_write(&mut self, high: bool) {
        let pin = self.pin;
        self.with_bridge(|bridge| bridge.digital_write(pin, high));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        // Pin=2, Length=3, Instruction=SERVO_WRITE, Angle=90
        let data = [2u8, 3, 0x01, 90];
        // ~(2+3+1+90) = ~96 = 159
        assert_eq!(SerialBridge::checksum(&data), 159);
    }

    #[test]
    fn test_build_servo_write_packet() {
        let packet = SerialBridge::build_packet(2, Instruction::ServoWrite, &[90]);
        assert_eq!(packet, vec![0xFF, 0xFF, 2, 3, 0x01, 90, 159]);
    }

    #[test]
    fn test_build_pulse_packet_little_endian() {
        let packet = SerialBridge::build_packet(1, Instruction::SetPulse, &1500u16.to_le_bytes());
        assert_eq!(packet.len(), 8);
        assert_eq!(&packet[4..7], &[0x02, 0xDC, 0x05]);
        assert_eq!(packet[7], SerialBridge::checksum(&packet[2..7]));
    }

    #[test]
    fn test_build_ir_request_packet() {
        let packet = SerialBridge::build_packet(IR_RECEIVER_ID, Instruction::ReadIrCode, &[]);
        // Header (2) + Pin (1) + Length (1) + Instruction (1) + Checksum (1) = 6 bytes
        assert_eq!(packet.len(), 6);
        assert_eq!(packet[2], IR_RECEIVER_ID);
        assert_eq!(packet[3], 2);
        assert_eq!(packet[4], 0x10);
    }

    fn reply_body(pin: u8, status: u8, params: &[u8]) -> Vec<u8> {
        let mut body = vec![status];
        body.extend_from_slice(params);
        let length = (body.len() + 1) as u8;
        let mut checksum_data = vec![pin, length];
        checksum_data.extend_from_slice(&body);
        body.push(SerialBridge::checksum(&checksum_data));
        body
    }

    #[test]
    fn test_check_response_returns_params() {
        let code: u32 = 0xf629D;
        let body = reply_body(IR_RECEIVER_ID, 0, &code.to_le_bytes());
        let params = SerialBridge::check_response(IR_RECEIVER_ID, IR_RECEIVER_ID, &body).unwrap();
        assert_eq!(params, code.to_le_bytes().to_vec());
    }

    #[test]
    fn test_check_response_rejects_bad_checksum() {
        let mut body = reply_body(IR_RECEIVER_ID, 0, &[1, 2, 3, 4]);
        let last = body.len() - 1;
        body[last] ^= 0xFF;
        assert!(matches!(
            SerialBridge::check_response(IR_RECEIVER_ID, IR_RECEIVER_ID, &body),
            Err(BridgeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_check_response_rejects_status_and_pin() {
        let body = reply_body(IR_RECEIVER_ID, 0x04, &[]);
        assert!(matches!(
            SerialBridge::check_response(IR_RECEIVER_ID, IR_RECEIVER_ID, &body),
            Err(BridgeError::Status { status: 0x04, .. })
        ));

        let body = reply_body(3, 0, &[]);
        assert!(matches!(
            SerialBridge::check_response(IR_RECEIVER_ID, 3, &body),
            Err(BridgeError::InvalidResponse { .. })
        ));
    }
}
