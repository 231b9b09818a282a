use clap::Parser;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sweep_config::{toml_config, SharedConfig};
use sweep_core::debug;
use sweep_engine::{SdrDevice, SoapySdrDevice, SweepController};

fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Spectrum sweeper",
    long_about = "Sweeps a frequency range over an SDR front-end, detects bursts and reports PSD measurements over UDP"
)]
struct Args {
    /// TOML config with device/sweep/sink parameters
    #[arg(help = "TOML config with device/sweep/sink parameters")]
    config: String,

    /// Verbose log file path
    #[arg(long)]
    log_file: Option<String>,
}

fn main() {
    eprintln!("spectrum sweeper\n");

    let args = Args::parse();
    let shared = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(args.log_file);

    let mut device = SoapySdrDevice::new();
    if let Err(e) = device.open(&shared.device().soapy_args, shared.device().channel) {
        tracing::error!(error = %e, "failed to open device");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(false));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(true, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    let mut controller = SweepController::new(device, shared, running);
    if let Err(e) = controller.run() {
        tracing::error!(error = %e, "sweep terminated with an error");
        std::process::exit(1);
    }
}
