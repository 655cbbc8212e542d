//! aamgrd daemon entry point.
//!
//! Initializes logging, builds the Auto-Attach registry over the in-memory
//! engine, and runs the control-loop tick: poll transmit timers, drain the
//! provisioning queue for the forwarding subsystem. Wiring to a real LLDP
//! stack and a real bridge replaces the in-memory engine behind the same
//! traits.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use aa_engine::{MemoryEngine, PortConfig};
use aamgrd::{AaConfig, AutoAttach, OwnerKey};

/// Control-loop tick, matching the poll cadence of the bridge layer.
const TICK_MS: u64 = 1000;

/// Demo iterations before exiting.
const DEMO_TICKS: u32 = 3;

fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run_event_loop(aa: &AutoAttach) -> Result<()> {
    info!("Starting event loop with {}ms tick", TICK_MS);

    for tick in 0..DEMO_TICKS {
        tokio::time::sleep(Duration::from_millis(TICK_MS)).await;

        // Transmit scheduler: produce a frame on every port whose timer is
        // due. A real deployment hands the frame to the datapath.
        for name in aa.instance_names() {
            if aa.should_transmit(&name) {
                if let Some(frame) = aa.produce_frame(&name, [0x02, 0, 0, 0, 0, 0x01]) {
                    info!("Produced {}-byte frame on '{}'", frame.len(), name);
                }
            }
        }

        // Forwarding subsystem: consume pending VLAN operations.
        let depth = aa.queue_depth();
        for op in aa.drain_all() {
            info!(
                "Provisioning: {} VLAN {} on port {}",
                op.op.as_str(),
                op.vlan,
                op.port_name
            );
        }
        info!("Tick {} complete ({} ops drained)", tick, depth);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting aamgrd ---");

    let aa = AutoAttach::new(Arc::new(MemoryEngine::new()));

    // Demo configuration: one enabled port and one registered mapping.
    let cfg = AaConfig { enable: true };
    let port = PortConfig::new("sw0p1", [0x02, 0, 0, 0, 0, 0x01], 1500);
    if aa.create_instance(&port, &cfg).is_none() {
        error!("Auto-Attach disabled for '{}'", port.name);
        return ExitCode::FAILURE;
    }
    aa.configure("aamgrd", "");
    aa.register_mapping(OwnerKey::new(1), 100, 5);

    match run_event_loop(&aa).await {
        Ok(()) => {
            aa.unref_instance("sw0p1");
            info!("aamgrd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("aamgrd error: {}", e);
            ExitCode::FAILURE
        }
    }
}
