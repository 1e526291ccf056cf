//! Reference service center run
//!
//! Three sources (warranty, corporate, private), three servers, a five-slot buffer
//! and a horizon of 1000. Prints a snapshot every `STEP_EVERY` events and the
//! end-of-run table.
//!
//! ```bash
//! cargo run --example service_center
//! RUST_LOG=mss_core=debug cargo run --example service_center -- 7
//! ```
//!
//! The optional argument is the master seed.

use mss_core::{init_simulation_logging, EngineSnapshot, Executor, SimulationConfig, SimulationEngine, SimError};
use tracing::info;

const STEP_EVERY: u64 = 200;

fn print_snapshot(snapshot: &EngineSnapshot) {
    println!("t = {}  ({:?})", snapshot.clock, snapshot.state);
    let slots: Vec<String> = snapshot
        .buffer
        .iter()
        .map(|slot| match slot {
            Some(view) => format!("{}:{}", view.request, view.priority),
            None => "-".to_string(),
        })
        .collect();
    println!("  buffer [{}] cursor={}", slots.join(" "), snapshot.buffer_cursor);
    for server in &snapshot.servers {
        match server.request {
            Some(request) => println!("  {} busy with {request}", server.id),
            None => println!("  {} idle", server.id),
        }
    }
    println!("  {} events pending", snapshot.calendar.len());
}

fn main() -> Result<(), SimError> {
    init_simulation_logging();

    let seed = std::env::args().nth(1).and_then(|arg| arg.parse().ok()).unwrap_or(1);
    let config = SimulationConfig::default().with_seed(seed);
    info!(seed, "Running reference service center");

    let mut engine = SimulationEngine::from_config(&config)?;
    let summary = engine.execute(Executor::to_completion().side_effect(|engine, _| {
        if engine.steps() % STEP_EVERY == 0 {
            print_snapshot(&engine.snapshot());
        }
    }))?;

    info!(steps = summary.steps, outcome = ?summary.outcome, "Run finished");
    println!();
    println!("{}", engine.report());
    Ok(())
}
