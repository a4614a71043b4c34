//! Runs the control server against the simulated game host.
//!
//! The real deployment embeds the library in the game's own loop; this
//! binary exists for development and scripted end-to-end testing, driving a
//! `SimHost` at a fixed tick rate.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use croupier_config::{Config, LogFormat, SocketEndpoint};
use croupierd::{ControlServer, sim::SimHost};

#[derive(Debug, Parser)]
#[command(name = "croupierd", about = "Control server over a simulated card game")]
struct Cli {
    /// Control socket endpoint, e.g. tcp://127.0.0.1:12346.
    #[arg(long)]
    socket: Option<SocketEndpoint>,

    /// Tracing filter expression.
    #[arg(long)]
    log_filter: Option<String>,

    /// Log output format.
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Host ticks per second.
    #[arg(long, default_value_t = 60)]
    tick_hz: u32,

    /// Ticks a simulated action takes to settle.
    #[arg(long, default_value_t = 2)]
    settle_delay: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("croupierd: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(socket) = cli.socket {
        config.socket = socket;
    }
    if let Some(filter) = cli.log_filter {
        config.log_filter = filter;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    let mut server = match ControlServer::start(&config) {
        Ok(server) => server,
        Err(startup_error) => {
            error!(%startup_error, "control server failed to start");
            return ExitCode::FAILURE;
        }
    };

    let mut host = SimHost::new(cli.settle_delay);
    let tick = Duration::from_secs(1) / cli.tick_hz.max(1);
    loop {
        host.tick();
        server.update(&mut host);
        thread::sleep(tick);
    }
}
