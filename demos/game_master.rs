//! Game master: plays a short scripted session through the relay
//!
//! Run with: cargo run --example game_master [SERVER_URL]
//!
//! SERVER_URL defaults to http://localhost:8000.

use std::sync::Arc;
use std::time::Duration;

use roll_broadcast::local::MemoryStore;
use roll_broadcast::{BroadcastConfig, RollBroadcaster, RollPayload};
use serde_json::json;

struct ScriptedRoll {
    player: &'static str,
    label: &'static str,
    modifier: i64,
    dc: Option<i64>,
    face: i64,
}

const SESSION: &[ScriptedRoll] = &[
    ScriptedRoll { player: "Aria", label: "Stealth", modifier: 5, dc: Some(15), face: 12 },
    ScriptedRoll { player: "Brom", label: "Attack", modifier: 3, dc: Some(14), face: 20 },
    ScriptedRoll { player: "Cass", label: "Perception", modifier: 1, dc: None, face: 1 },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_owned());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roll_broadcast=debug".parse()?)
                .add_directive("game_master=debug".parse()?),
        )
        .init();

    let master = RollBroadcaster::new(BroadcastConfig::default(), Arc::new(MemoryStore::new()));
    master.set_server_url(&server_url);

    for roll in SESSION {
        let mut payload = RollPayload::new()
            .player_name(roll.player)
            .label(roll.label)
            .modifier(roll.modifier)
            .dice(json!([{ "sides": 20, "count": 1 }]));
        if let Some(dc) = roll.dc {
            payload = payload.difficulty_class(dc);
        }

        let started = master.start_rolling(payload);
        println!("{} rolls {} ({})", roll.player, roll.label, started.id);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let result = master.show_result(
            RollPayload::new()
                .value(roll.face)
                .total(roll.face + roll.modifier)
                .nat20(roll.face == 20)
                .nat1(roll.face == 1),
        );
        println!("  -> {:?}", result.total);
        tokio::time::sleep(Duration::from_secs(3)).await;

        master.clear_roll();
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let stats = master.stats();
    println!(
        "Pushes sent: {}, failed: {}",
        stats.pushes_sent, stats.pushes_failed
    );

    Ok(())
}
