//! Chain Arena Client
//!
//! Headless driver for the client core. Runs an offline demo session:
//! a local player plus fill-in bots, scripted input, and the full per-frame
//! reconciliation pipeline, with outbound intents logged instead of
//! submitted (no wallet is attached in the demo).

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chain_arena::chain::sync::RESPAWN_POINT;
use chain_arena::chain::ChainConfig;
use chain_arena::game::{GameController, KeyCode, OutboundIntent};
use chain_arena::net::RealtimeTransport;
use chain_arena::perf::FrameMetrics;
use chain_arena::state::{EntityState, GameStore, SessionState};
use chain_arena::{Vec3, FRAME_RATE, VERSION};

const DEMO_SESSION_ID: &str = "demo-session";
const DEMO_PLAYER_ID: &str = "demo-player";
const DEMO_SECONDS: u32 = 30;
const BOT_SEED: u64 = 0xC0FFEE;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Chain Arena Client v{}", VERSION);

    let config = ChainConfig::from_env();
    info!(
        network = ?config.network,
        rpc = %config.rpc_url,
        package = %config.package_id,
        module = %config.module,
        realtime = config.realtime_endpoint.is_some(),
        "configuration loaded"
    );

    demo_session(&config).await;
    Ok(())
}

/// Run the offline demo session.
async fn demo_session(config: &ChainConfig) {
    info!("=== Starting Demo Session ===");

    let store = Arc::new(GameStore::new());
    store.set_session(SessionState {
        id: DEMO_SESSION_ID.to_string(),
        name: "Demo Arena".to_string(),
        creator: "0xdemo".to_string(),
        active: true,
        player_count: 1,
        max_players: 32,
        created_at_ms: 0,
    });
    store.set_local(EntityState::new(
        DEMO_PLAYER_ID,
        "0xdemo",
        "Pilot",
        Vec3::new(0.0, 0.4, 0.0),
    ));

    // With no endpoint configured this resolves immediately and the demo
    // runs in ledger-only mode; with one, frames flow opportunistically.
    let transport = Arc::new(RealtimeTransport::new(config.realtime_endpoint.clone()));
    transport.connect(DEMO_PLAYER_ID, DEMO_SESSION_ID).await;
    info!(connected = transport.is_connected(), "realtime transport");

    let mut controller =
        GameController::new(Arc::clone(&store), Some(Arc::clone(&transport)), BOT_SEED);
    let bots = controller.spawn_fill_bots();
    info!(bots, "session filled with bots");

    let mut metrics = FrameMetrics::new();
    let dt = 1.0 / FRAME_RATE as f32;
    let frames = DEMO_SECONDS * FRAME_RATE;
    let mut attacks_sent = 0u32;
    let mut respawns = 0u32;

    info!("Running {} frames...", frames);

    for frame in 0..frames {
        script_input(&mut controller, frame);

        let started = Instant::now();
        controller.update(dt);
        metrics.record("frame_ms", started.elapsed().as_secs_f64() * 1000.0);

        for intent in controller.take_outbox() {
            match intent {
                OutboundIntent::Attack { target_id, damage } => {
                    attacks_sent += 1;
                    info!(%target_id, damage, "attack intent ready for ledger submission");
                }
                OutboundIntent::Respawn => {
                    info!("respawn intent ready for ledger submission");
                }
            }
        }

        // The demo has no ledger to confirm a respawn, so emulate the
        // confirmation locally once the player goes down.
        if store.local().is_some_and(|l| !l.alive) {
            respawns += 1;
            controller.request_respawn();
            store.respawn_entity(DEMO_PLAYER_ID, RESPAWN_POINT);
            info!("player defeated; respawned at spawn point");
        }

        if frame > 0 && frame % (10 * FRAME_RATE) == 0 {
            let snapshot = store.snapshot();
            let alive = snapshot.remotes.iter().filter(|r| r.alive).count();
            let health = snapshot.local.map_or(0, |l| l.health);
            info!(
                frame,
                health,
                bots_alive = alive,
                frame_ms = metrics.mean("frame_ms"),
                "progress"
            );
        }
    }

    let snapshot = store.snapshot();
    info!("=== Session Results ===");
    if let Some(local) = &snapshot.local {
        info!(
            health = local.health,
            alive = local.alive,
            position = %local.position,
            "local player"
        );
    }
    for remote in &snapshot.remotes {
        info!(
            id = %remote.id,
            health = remote.health,
            alive = remote.alive,
            "bot"
        );
    }
    info!(
        attacks_sent,
        respawns,
        mean_frame_ms = metrics.mean("frame_ms"),
        "totals"
    );

    transport.disconnect();
}

/// Scripted input: wander in a square, swing periodically, jump and heal on
/// a longer cycle.
fn script_input(controller: &mut GameController, frame: u32) {
    let input = controller.input_mut();

    for key in [KeyCode::W, KeyCode::D, KeyCode::S, KeyCode::A] {
        input.key_up(key);
    }
    let heading = match (frame / 120) % 4 {
        0 => KeyCode::W,
        1 => KeyCode::D,
        2 => KeyCode::S,
        _ => KeyCode::A,
    };
    input.key_down(heading);

    match frame % 90 {
        0 => input.pointer_down(),
        30 => input.pointer_up(),
        _ => {}
    }

    match frame % 300 {
        150 => input.key_down(KeyCode::Space),
        152 => input.key_up(KeyCode::Space),
        _ => {}
    }

    match frame % 600 {
        400 => input.key_down(KeyCode::E),
        402 => input.key_up(KeyCode::E),
        _ => {}
    }
}
