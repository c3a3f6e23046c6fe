// 50 Hz loop: drive commands in, IR keys and servo state out
// Everything touching the car happens on this one task; callbacks run inside
// the poll tick, so a slow callback delays the next tick.

use std::error::Error;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::car::DeskBit;
use crate::config::{
    ARM_PIN, LEFT_WHEEL_PIN, POLL_INTERVAL, RIGHT_WHEEL_PIN, TOPIC_CMD_CAR, TOPIC_IR_KEY,
    TOPIC_IR_RAW, TOPIC_SERVO_STATE,
};
use crate::ir::{IrSource, LatchedCode};
use crate::messages::{CarCommand, KeyEvent, RawIrCode, ServoState};
use crate::servo::{BridgeError, BridgePin, Mirrored, SerialBridge, ServoPin, SimPin};

pub type BoxError = Box<dyn Error + Send + Sync>;

type Car = DeskBit<Box<dyn ServoPin + Send>, Box<dyn IrSource + Send>>;

/// How the runtime reaches the car
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Serial bridge port; simulated pins and bus-fed IR codes when None
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    /// Register the key-publishing listener at startup
    pub listen: bool,
}

pub struct Runtime {
    car: Car,
    // What was last sent to each servo (left, right, arm)
    mirrors: [SimPin; 3],
    // Present in simulation, where raw codes arrive over the bus
    raw_codes: Option<LatchedCode>,
    keys_tx: mpsc::UnboundedSender<i32>,
    keys_rx: mpsc::UnboundedReceiver<i32>,
}

impl Runtime {
    pub fn new(options: &RuntimeOptions) -> Result<Self, BridgeError> {
        let mirrors = [SimPin::new(), SimPin::new(), SimPin::new()];
        let (keys_tx, keys_rx) = mpsc::unbounded_channel();

        let (car, raw_codes) = match &options.port {
            Some(port) => {
                info!("Opening servo bridge on {}", port);
                let bridge = match options.baudrate {
                    Some(baud) => SerialBridge::open_with_baudrate(port, baud)?,
                    None => SerialBridge::open(port)?,
                }
                .into_shared();

                let pin = |id: u8, mirror: &SimPin| -> Box<dyn ServoPin + Send> {
                    Box::new(Mirrored::new(
                        BridgePin::new(bridge.clone(), id),
                        mirror.clone(),
                    ))
                };
                let car = DeskBit::new(
                    pin(LEFT_WHEEL_PIN, &mirrors[0]),
                    pin(RIGHT_WHEEL_PIN, &mirrors[1]),
                    pin(ARM_PIN, &mirrors[2]),
                    Box::new(bridge.clone()) as Box<dyn IrSource + Send>,
                );
                (car, None)
            }
            None => {
                info!("No bridge port given, running with simulated pins");
                let codes = LatchedCode::new();
                let car = DeskBit::new(
                    Box::new(mirrors[0].clone()) as Box<dyn ServoPin + Send>,
                    Box::new(mirrors[1].clone()) as Box<dyn ServoPin + Send>,
                    Box::new(mirrors[2].clone()) as Box<dyn ServoPin + Send>,
                    Box::new(codes.clone()) as Box<dyn IrSource + Send>,
                );
                (car, Some(codes))
            }
        };

        let mut runtime = Self {
            car,
            mirrors,
            raw_codes,
            keys_tx,
            keys_rx,
        };
        if options.listen {
            runtime.start_listening();
        }
        Ok(runtime)
    }

    /// Register the listener that forwards keys to the bus
    pub fn start_listening(&mut self) {
        // A code latched before registration is not a press to report
        if let Some(codes) = &self.raw_codes {
            codes.clear();
        }
        let tx = self.keys_tx.clone();
        self.car.on_key_received(move |key| {
            // Receiver lives as long as the runtime
            let _ = tx.send(key);
        });
    }

    /// Apply one drive command; `ReadKey` yields an event to publish
    pub fn on_command(&mut self, cmd: CarCommand) -> Option<KeyEvent> {
        debug!("Received command: {:?}", &cmd);
        match cmd {
            CarCommand::Run { direction, speed } => self.car.run(direction, speed),
            CarCommand::RunWheel {
                side,
                direction,
                speed,
            } => self.car.run_wheel(side, direction, speed),
            CarCommand::Stop => self.car.stop(),
            CarCommand::SetArmAngle { angle } => self.car.set_arm_angle(angle),
            CarCommand::ReadKey => {
                return Some(KeyEvent {
                    key: self.car.read_decoded_key(),
                });
            }
        }
        None
    }

    /// Feed a raw code received over the bus; it stays readable until the
    /// end of the next tick
    pub fn on_raw_code(&mut self, raw: RawIrCode) {
        match &self.raw_codes {
            Some(codes) => codes.push(raw.code),
            None => debug!("Ignoring bus IR code 0x{:X}, receiver is on the bridge", raw.code),
        }
    }

    /// One poll tick; returns the key events the callbacks produced
    pub fn tick(&mut self) -> Vec<KeyEvent> {
        self.car.poll_tick();
        if let Some(codes) = &self.raw_codes {
            codes.clear();
        }

        let mut events = Vec::new();
        while let Ok(key) = self.keys_rx.try_recv() {
            events.push(KeyEvent { key });
        }
        events
    }

    pub fn servo_state(&self) -> ServoState {
        ServoState {
            left: self.mirrors[0].angle(),
            right: self.mirrors[1].angle(),
            arm: self.mirrors[2].angle(),
            listening: self.car.listener().is_listening(),
        }
    }

    pub fn stop(&mut self) {
        self.car.stop();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Continuous-rotation wheels keep their last speed until told otherwise
        info!("Runtime shutting down, stopping wheels");
        self.stop();
    }
}

pub async fn run(options: RuntimeOptions) -> Result<(), BoxError> {
    let mut runtime = Runtime::new(&options)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let result = serve(&mut runtime, &session).await;

    // Leave the wheels still whatever made the loop exit
    drop(runtime);
    result
}

async fn serve(runtime: &mut Runtime, session: &zenoh::Session) -> Result<(), BoxError> {
    info!("Setting up publishers and subscribers...");
    let sub_cmd = session.declare_subscriber(TOPIC_CMD_CAR).await?;
    let sub_raw = session.declare_subscriber(TOPIC_IR_RAW).await?;
    let pub_key = session.declare_publisher(TOPIC_IR_KEY).await?;
    let pub_state = session.declare_publisher(TOPIC_SERVO_STATE).await?;

    let mut tick = interval(POLL_INTERVAL);

    info!(
        "Runtime started: {}ms poll interval",
        POLL_INTERVAL.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_CAR, TOPIC_IR_RAW);
    info!("Publishing to: {}, {}", TOPIC_IR_KEY, TOPIC_SERVO_STATE);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested");
                return Ok(());
            }
            _ = tick.tick() => {}
        }

        // 1. Latch raw IR codes (non-blocking)
        while let Ok(Some(sample)) = sub_raw.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<RawIrCode>(&payload) {
                Ok(raw) => runtime.on_raw_code(raw),
                Err(e) => warn!("Failed to parse IR code: {}", e),
            }
        }

        // 2. Apply drive commands in arrival order
        let mut events = Vec::new();
        while let Ok(Some(sample)) = sub_cmd.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<CarCommand>(&payload) {
                Ok(cmd) => events.extend(runtime.on_command(cmd)),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 3. Poll the receiver and dispatch
        events.extend(runtime.tick());

        // 4. Publish keys and servo state
        for event in events {
            pub_key.put(serde_json::to_string(&event)?).await?;
        }
        let state_json = serde_json::to_string(&runtime.servo_state())?;
        pub_state.put(state_json).await?;
    }
}
