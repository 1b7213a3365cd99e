//! Desktop command station with mock hardware.
//!
//! Runs the full station against simulated pins and track driver:
//! - DCC++ over TCP on port 2560 (point JMRI or Engine Driver at it)
//! - JSON API on port 8080
//! - Layout persisted as JSON documents under `cs-data/`
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin desktop_station --features desktop
//! cargo run --bin desktop_station --features desktop -- station.json
//! ```
//!
//! The optional argument is a JSON [`StationConfig`]; missing fields take
//! their defaults. Set `RUST_LOG=debug` for per-command logging.

use std::sync::Arc;

use anyhow::{Context, Result};

use rs_cmdstation::hal::{FileStore, MockHardware, MockPixelBus, MockSerial};
use rs_cmdstation::scheduler::Scheduler;
use rs_cmdstation::services::{
    run_server, run_tcp_server, spawn_update_loop, SharedStation, TcpServerConfig,
    WebServerConfig,
};
use rs_cmdstation::tasks::{spawn_core_tasks, RadioTask, StatusLedTask, LED_COUNT};
use rs_cmdstation::{CommandStation, StationConfig};

fn load_config() -> Result<StationConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(StationConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let runtime = tokio::runtime::Runtime::new().context("creating tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: StationConfig) -> Result<()> {
    println!("=================================");
    println!("  rs-cmdstation Desktop Station");
    println!("=================================");
    println!();

    let store = FileStore::new(config.storage.path.as_str());
    let mock = MockHardware::new();
    let mut station = CommandStation::new(config.clone(), mock.hardware(), Box::new(store));
    station.init();

    let mut scheduler = Scheduler::new();
    scheduler.spawn(StatusLedTask::new(Box::new(MockPixelBus::new(LED_COUNT))));
    scheduler.spawn(RadioTask::new(Box::new(MockSerial::new())));
    spawn_core_tasks(&mut scheduler);

    let state = Arc::new(SharedStation::new(station, scheduler));
    spawn_update_loop(Arc::clone(&state));

    let tcp_config = TcpServerConfig::from_config(&config.net);
    let web_config = WebServerConfig::from_config(&config.web);

    if config.web.enabled {
        println!("  JSON API: http://{}/api/power", web_config.addr);
        let web_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = run_server(web_state, web_config).await {
                log::error!("[Web] Server stopped: {err}");
            }
        });
    }

    if config.net.enabled {
        println!("  DCC++:    {}", tcp_config.addr);
    }
    println!();
    println!("Press Ctrl+C to stop.");

    let listener = {
        let state = Arc::clone(&state);
        let enabled = config.net.enabled;
        async move {
            if enabled {
                run_tcp_server(state, tcp_config).await
            } else {
                std::future::pending::<std::io::Result<()>>().await
            }
        }
    };

    tokio::select! {
        result = listener => result.context("DCC++ listener failed")?,
        signal = tokio::signal::ctrl_c() => signal.context("waiting for Ctrl+C")?,
    }

    if let Some(counts) = state.shutdown()? {
        log::info!(
            "[Store] Saved {} turnouts, {} sensors, {} outputs",
            counts.turnouts,
            counts.sensors,
            counts.outputs
        );
    }

    Ok(())
}
