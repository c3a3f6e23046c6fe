// Keyboard IR remote: 0-9 and a-g press keys 0..=16, Q/Esc quit
//
// Publishes the raw code the physical remote would send, so the runtime
// decodes it exactly as it would a real button press.
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::{info, warn};

use deskbit_car::config::TOPIC_IR_RAW;
use deskbit_car::ir::code_for_key;
use deskbit_car::messages::RawIrCode;

// Poll for keys at the runtime's 50Hz
const POLL_TIMEOUT: Duration = Duration::from_millis(20);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_IR_RAW).await?;

    info!("Keys: 0-9 = buttons 0-9, a-g = buttons 10-16, Q = quit");

    enable_raw_mode()?;
    let result = run_remote(&publisher).await;
    disable_raw_mode()?;

    result
}

/// Remote button for a keyboard key
fn button_for(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(c @ '0'..='9') => Some(c as u8 - b'0'),
        KeyCode::Char(c @ 'a'..='g') => Some(c as u8 - b'a' + 10),
        _ => None,
    }
}

async fn run_remote(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        if !event::poll(POLL_TIMEOUT)? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        // Held keys repeat, like a held remote button
        let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
        if !pressed {
            continue;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            other => match button_for(other).and_then(code_for_key) {
                Some(raw) => {
                    let msg = serde_json::to_string(&RawIrCode { code: raw })?;
                    publisher.put(msg).await?;
                }
                None => warn!("No remote button for {:?}", other),
            },
        }
    }

    Ok(())
}
