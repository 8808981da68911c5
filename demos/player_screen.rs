//! Player screen: prints every roll the relay forwards
//!
//! Run with: cargo run --example player_screen [SERVER_URL]
//!
//! SERVER_URL defaults to http://localhost:8000 and may also be the tower's
//! detection URL, e.g. http://192.168.4.1/detect.

use std::sync::Arc;

use roll_broadcast::local::MemoryStore;
use roll_broadcast::{BroadcastConfig, RollBroadcaster, RollSlot, RollStatus};

fn describe(slot: &RollSlot) -> String {
    match slot {
        RollSlot::Empty => "waiting for the first roll".to_owned(),
        RollSlot::Cleared => "roll cleared".to_owned(),
        RollSlot::Active(event) => match event.status {
            RollStatus::Rolling => format!("{} is rolling {}...", event.player_name, event.label),
            RollStatus::Result => {
                let mut line = format!(
                    "{} rolled {}: {}",
                    event.player_name,
                    event.label,
                    event.total.map_or_else(|| "?".to_owned(), |t| t.to_string())
                );
                if event.is_nat20 {
                    line.push_str(" (natural 20!)");
                } else if event.is_nat1 {
                    line.push_str(" (natural 1)");
                }
                match event.meets_difficulty() {
                    Some(true) => line.push_str(" success"),
                    Some(false) => line.push_str(" failure"),
                    None => {}
                }
                line
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_owned());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roll_broadcast=info".parse()?)
                .add_directive("player_screen=debug".parse()?),
        )
        .init();

    let screen = RollBroadcaster::new(BroadcastConfig::default(), Arc::new(MemoryStore::new()));
    screen.connect_websocket(Some(&server_url));

    let mut roll = screen.watch_roll();
    let mut connected = screen.watch_connected();

    println!("Player screen subscribed to {}", server_url);
    println!("{}", describe(&roll.borrow_and_update()));

    loop {
        tokio::select! {
            changed = roll.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", describe(&roll.borrow_and_update()));
            }
            changed = connected.changed() => {
                if changed.is_err() {
                    break;
                }
                let is_connected = *connected.borrow_and_update();
                match screen.connection_error() {
                    Some(error) if !is_connected => println!("[disconnected: {}]", error),
                    _ if is_connected => println!("[connected]"),
                    _ => println!("[disconnected]"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    screen.disconnect_websocket();
    Ok(())
}
