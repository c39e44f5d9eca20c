//! Persistent session example: connect, follow the output, send commands
//!
//! Opens a persistent session (login prompts are answered automatically),
//! prints everything the device sends, sends each remaining command-line
//! argument as a line and disconnects.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example stream_session -- 10.0.0.1 admin secret "show clock" "show version"
//! ```

use std::env;
use std::time::Duration;

use futures_util::StreamExt;
use termbridge::{Bridge, BridgeConfig, ConnectRequest, StreamStart, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: stream_session <host> <user> <password> [command...]");
        std::process::exit(1);
    }

    let kind = if env::var("TELNET").is_ok() {
        TransportKind::Telnet
    } else {
        TransportKind::Ssh
    };

    let bridge = Bridge::new(BridgeConfig::default());
    let id = bridge
        .connect(
            ConnectRequest::new()
                .kind(kind)
                .host(&args[0])
                .username(&args[1])
                .password(&args[2]),
        )
        .await?;
    println!("Session {}", id);

    let output = bridge.subscribe(&id, StreamStart::Beginning)?.into_stream();
    let printer = tokio::spawn(async move {
        futures_util::pin_mut!(output);
        while let Some(chunk) = output.next().await {
            print!("{}", chunk);
        }
    });

    // Let the login finish before typing.
    tokio::time::sleep(Duration::from_secs(3)).await;
    for command in &args[3..] {
        bridge.send(&id, command)?;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    bridge.disconnect(&id)?;
    printer.await?;
    println!();

    Ok(())
}
