//! One-shot example: log in to a device and print its configuration
//!
//! Connects over SSH or Telnet, walks the login / enable prompts for the
//! given vendor, runs the vendor's "show configuration" command and prints
//! the captured output.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_config -- --host 10.0.0.1 --user admin --password secret --vendor 2
//! cargo run --example run_config -- --telnet --host 10.0.0.2 --user admin --password secret \
//!     --enable-password en --vendor 2
//! ```
//!
//! Vendor ids: 1 Juniper, 2 Cisco, 3 Huawei, 4 Arista. Anything else uses
//! `show running-config` with `enable`.

use std::env;
use std::time::Duration;

use termbridge::{Bridge, BridgeConfig, ConnectRequest, RunRequest, TransportKind};

#[tokio::main]
async fn main() {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut connect = ConnectRequest::new()
        .kind(args.kind)
        .host(&args.host)
        .username(&args.user)
        .password(&args.password)
        .vendor(args.vendor);
    if let Some(port) = args.port {
        connect = connect.port(port);
    }
    if let Some(enable) = &args.enable_password {
        connect = connect.enable_password(enable);
    }

    println!("Running against {} ({}), vendor {}...", args.host, args.kind, args.vendor);

    let bridge = Bridge::new(BridgeConfig::default());
    let result = bridge
        .run(RunRequest::new(connect).timeout(Duration::from_secs(args.timeout)))
        .await;

    println!("{}", "-".repeat(50));
    println!("{}", result.output);
    println!("{}", "-".repeat(50));
    println!(
        "{} in {:?}: {}",
        if result.success { "Succeeded" } else { "Failed" },
        result.elapsed,
        result.message
    );

    if !result.success {
        std::process::exit(1);
    }
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    kind: TransportKind,
    host: String,
    port: Option<u16>,
    user: String,
    password: String,
    enable_password: Option<String>,
    vendor: u8,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut kind = TransportKind::Ssh;
        let mut host = "localhost".to_string();
        let mut port = None;
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = String::new();
        let mut enable_password = None;
        let mut vendor = 0u8;
        let mut timeout = 30u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--telnet" => kind = TransportKind::Telnet,
                "--ssh" => kind = TransportKind::Ssh,
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().ok();
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = args[i].clone();
                    }
                }
                "--enable-password" | "-e" => {
                    i += 1;
                    if i < args.len() {
                        enable_password = Some(args[i].clone());
                    }
                }
                "--vendor" | "-v" => {
                    i += 1;
                    if i < args.len() {
                        vendor = args[i].parse().unwrap_or(0);
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            kind,
            host,
            port,
            user,
            password,
            enable_password,
            vendor,
            timeout,
        }
    }

    fn print_help() {
        println!(
            r#"termbridge run_config example

USAGE:
    cargo run --example run_config -- [OPTIONS]

OPTIONS:
    --ssh | --telnet                 Transport [default: ssh]
    -h, --host <HOST>                Target host [default: localhost]
    -p, --port <PORT>                Port [default: 22 / 23]
    -u, --user <USER>                Username [default: $USER]
    -P, --password <PASS>            Login password
    -e, --enable-password <PASS>     Enable password [default: login password]
    -v, --vendor <ID>                Vendor id [default: 0]
    -t, --timeout <SECS>             Run timeout [default: 30]
    --help                           Print this help message
"#
        );
    }
}
