use clap::Parser;
use tracing_subscriber::EnvFilter;

use deskbit_car::config::BRIDGE_PORT;
use deskbit_car::runtime::RuntimeOptions;

/// DeskBit car runtime: drive commands and IR keys over Zenoh
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial port of the servo bridge (simulated pins when omitted,
    /// the default bridge port when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = BRIDGE_PORT)]
    port: Option<String>,

    /// Bridge baudrate
    #[arg(long)]
    baud: Option<u32>,

    /// Do not start the IR listener at startup
    #[arg(long)]
    no_listen: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let options = RuntimeOptions {
        port: args.port,
        baudrate: args.baud,
        listen: !args.no_listen,
    };

    if let Err(e) = deskbit_car::runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
