//! Roll relay for remote player screens
//!
//! Run with: cargo run --example relay [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example relay                    # binds to 0.0.0.0:8000
//!   cargo run --example relay localhost          # binds to 127.0.0.1:8000
//!   cargo run --example relay 127.0.0.1:8080     # binds to 127.0.0.1:8080
//!
//! Then point the game master at it:
//!   cargo run --example game_master http://localhost:8000
//!
//! And open any number of player screens:
//!   cargo run --example player_screen http://localhost:8000

use std::net::{IpAddr, SocketAddr};

use roll_broadcast::{RelayConfig, RollRelay};

/// Parse bind address from command line argument
///
/// Accepts "localhost", "localhost:PORT", "IP" and "IP:PORT".
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8000;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8000)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => RelayConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => RelayConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roll_broadcast=debug".parse()?)
                .add_directive("relay=debug".parse()?),
        )
        .init();

    println!("Starting roll relay on {}", config.bind_addr);
    println!("  POST/DELETE/GET  http://{}/roll", config.bind_addr);
    println!("  WebSocket        ws://{}/ws/roll", config.bind_addr);
    println!();

    let relay = RollRelay::new(config);
    relay
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
